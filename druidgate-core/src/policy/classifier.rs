//! Name-based tool classification.
//!
//! A tool is read-only when its name is one of the explicitly allowed
//! operations or starts with one of the read prefixes. Everything else,
//! including a missing or empty name, is mutating.

/// Read prefixes. Matching is case-sensitive: `getFoo` is read-only,
/// `GetFoo` is not.
const READ_PREFIXES: [&str; 6] = ["get", "list", "show", "view", "health", "status"];

/// Tools that are read-only despite not carrying a read prefix.
///
/// `queryDruidSql` submits arbitrary SQL over `POST`; `taskStatusById` looks up
/// a task by id and is named noun-first.
const ALLOWED_OPERATIONS: [&str; 2] = ["queryDruidSql", "taskStatusById"];

/// Text returned to callers alongside a denial so they can pick another tool.
pub const ALLOWED_TOOLS_HINT: &str = "Read-only mode is enabled. Allowed tools are those whose \
names start with get, list, show, view, health or status, plus queryDruidSql and taskStatusById.";

/// Result of classifying an operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    ReadOnly,
    Mutating,
}

impl Classification {
    #[inline]
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::Mutating => "mutating",
        }
    }
}

/// Pure, total mapping from tool name to [`Classification`].
///
/// Stateless; shared by the invocation guard and the discovery filter so both
/// interception points agree on every name.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationClassifier;

impl OperationClassifier {
    pub const fn new() -> Self {
        Self
    }

    /// Classify a possibly-missing name. `None` and `""` are mutating.
    pub fn classify(&self, name: Option<&str>) -> Classification {
        match name {
            Some(name) if !name.is_empty() => self.classify_name(name),
            _ => Classification::Mutating,
        }
    }

    /// Classify a name that is known to be present.
    pub fn classify_name(&self, name: &str) -> Classification {
        if name.is_empty() {
            return Classification::Mutating;
        }
        if ALLOWED_OPERATIONS.contains(&name) {
            return Classification::ReadOnly;
        }
        if READ_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
            return Classification::ReadOnly;
        }
        Classification::Mutating
    }

    #[inline]
    pub fn is_read_only(&self, name: &str) -> bool {
        self.classify_name(name).is_read_only()
    }

    pub fn allowed_tools_hint(&self) -> &'static str {
        ALLOWED_TOOLS_HINT
    }
}
