//! Invocation guard: gates every `tools/call`.

use std::future::Future;

use serde_json::json;

use super::classifier::{Classification, OperationClassifier};
use super::state::PolicyState;
use crate::error::DruidGateError;
use crate::protocol::{OperationDescriptor, ReturnKind, ToolOutput};

/// Value of the `error` field in the text denial payload.
pub const DENIAL_ERROR_CODE: &str = "read_only_mode";

const RAISED_REASON: &str = "server is running in read-only mode";

/// Why and how a call was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Returned to text-returning tools as a JSON string in place of their output.
    StructuredError { message: String, hint: &'static str },
    /// Raised as [`DruidGateError::ReadOnlyDenied`] for every other tool.
    Raised { reason: String },
}

impl Denial {
    /// JSON payload handed back to text-returning tools.
    ///
    /// Same operation name, same payload: denials are idempotent.
    pub fn payload(&self) -> Option<String> {
        match self {
            Self::StructuredError { message, hint } => Some(denial_payload(message, hint)),
            Self::Raised { .. } => None,
        }
    }

    fn into_result(self, tool: &str) -> Result<ToolOutput, DruidGateError> {
        match self {
            Self::StructuredError { message, hint } => {
                Ok(ToolOutput::Text(denial_payload(&message, hint)))
            }
            Self::Raised { reason } => Err(DruidGateError::ReadOnlyDenied {
                tool: tool.to_string(),
                reason,
            }),
        }
    }
}

fn denial_payload(message: &str, hint: &str) -> String {
    json!({
        "error": DENIAL_ERROR_CODE,
        "message": message,
        "allowedToolsHint": hint,
    })
    .to_string()
}

/// Wraps tool handlers and short-circuits mutating calls in read-only mode.
///
/// The decision is taken before the call is constructed: a denied call's
/// future is never created, so it cannot have side effects.
#[derive(Debug, Clone, Copy)]
pub struct InvocationGuard {
    state: PolicyState,
    classifier: OperationClassifier,
}

impl InvocationGuard {
    pub fn new(state: PolicyState, classifier: OperationClassifier) -> Self {
        Self { state, classifier }
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }

    /// Pure decision for a descriptor. `None` means the call may run.
    pub fn evaluate(&self, descriptor: &OperationDescriptor) -> Option<Denial> {
        if !self.state.is_enabled() {
            return None;
        }
        if self.classifier.classify(Some(&descriptor.name)) == Classification::ReadOnly {
            return None;
        }

        Some(match descriptor.return_kind {
            ReturnKind::Text => Denial::StructuredError {
                message: format!(
                    "Operation '{}' is not allowed: the server is running in read-only mode",
                    descriptor.name
                ),
                hint: self.classifier.allowed_tools_hint(),
            },
            ReturnKind::Structured => Denial::Raised {
                reason: RAISED_REASON.to_string(),
            },
        })
    }

    /// Run `call` unless the policy denies `descriptor`.
    ///
    /// Allowed calls return exactly what `call` returns. Denied text tools get
    /// the denial payload as their output; denied structured tools get
    /// [`DruidGateError::ReadOnlyDenied`].
    pub async fn invoke<F, Fut>(
        &self,
        descriptor: &OperationDescriptor,
        call: F,
    ) -> Result<ToolOutput, DruidGateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ToolOutput, DruidGateError>>,
    {
        match self.evaluate(descriptor) {
            Some(denial) => denial.into_result(&descriptor.name),
            None => call().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn guard(enabled: bool) -> InvocationGuard {
        InvocationGuard::new(PolicyState::new(enabled), OperationClassifier::new())
    }

    /// A tool handler that counts how often it actually ran.
    fn counting_call(
        counter: &Arc<AtomicUsize>,
        output: ToolOutput,
    ) -> impl FnOnce() -> std::future::Ready<Result<ToolOutput, DruidGateError>> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(output))
        }
    }

    #[tokio::test]
    async fn test_mutating_text_tool_is_short_circuited() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = OperationDescriptor::text("createAuthenticationUser");

        let result = guard(true)
            .invoke(
                &descriptor,
                counting_call(&counter, ToolOutput::Text("created".into())),
            )
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        let payload: serde_json::Value = serde_json::from_str(result.as_text().unwrap()).unwrap();
        assert_eq!(payload["error"], "read_only_mode");
        assert!(
            payload["message"]
                .as_str()
                .unwrap()
                .contains("createAuthenticationUser")
        );
        assert!(payload["allowedToolsHint"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_read_only_tool_passes_through() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = OperationDescriptor::text("listDatasources");

        let result = guard(true)
            .invoke(
                &descriptor,
                counting_call(&counter, ToolOutput::Text("[\"wikipedia\"]".into())),
            )
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(result, ToolOutput::Text("[\"wikipedia\"]".into()));
    }

    #[tokio::test]
    async fn test_disabled_policy_runs_mutating_tool() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = OperationDescriptor::text("deleteAuthenticationUser");

        let result = guard(false)
            .invoke(
                &descriptor,
                counting_call(&counter, ToolOutput::Text("deleted".into())),
            )
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(result, ToolOutput::Text("deleted".into()));
    }

    #[tokio::test]
    async fn test_mutating_structured_tool_raises() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = OperationDescriptor::structured("deleteLookup");

        let err = guard(true)
            .invoke(
                &descriptor,
                counting_call(&counter, ToolOutput::Structured(serde_json::json!({}))),
            )
            .await
            .unwrap_err();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(matches!(
            err,
            DruidGateError::ReadOnlyDenied { ref tool, .. } if tool == "deleteLookup"
        ));
    }

    #[tokio::test]
    async fn test_handler_errors_pass_through_unchanged() {
        let descriptor = OperationDescriptor::text("listTasks");
        let err = guard(true)
            .invoke(&descriptor, || async {
                Err(DruidGateError::EngineTimeout { timeout_secs: 5 })
            })
            .await
            .unwrap_err();

        assert_eq!(err, DruidGateError::EngineTimeout { timeout_secs: 5 });
    }

    #[test]
    fn test_denial_payload_is_idempotent() {
        let guard = guard(true);
        let descriptor = OperationDescriptor::text("killTask");

        let first = guard.evaluate(&descriptor).unwrap().payload().unwrap();
        let second = guard.evaluate(&descriptor).unwrap().payload().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_denial_output_is_the_payload() {
        let denial = guard(true)
            .evaluate(&OperationDescriptor::text("killTask"))
            .unwrap();
        let expected = denial.payload().unwrap();

        let output = denial.into_result("killTask").unwrap();
        assert_eq!(output, ToolOutput::Text(expected));
        assert!(output.as_text().is_some_and(|text| !text.is_empty()));
    }

    #[test]
    fn test_evaluate_allows_everything_when_disabled() {
        let guard = guard(false);
        assert!(
            guard
                .evaluate(&OperationDescriptor::text("killTask"))
                .is_none()
        );
        assert!(
            guard
                .evaluate(&OperationDescriptor::structured(""))
                .is_none()
        );
    }

    #[test]
    fn test_empty_name_is_denied_when_enabled() {
        let denial = guard(true).evaluate(&OperationDescriptor::structured(""));
        assert!(matches!(denial, Some(Denial::Raised { .. })));
    }
}
