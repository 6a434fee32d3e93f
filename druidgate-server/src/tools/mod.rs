//! The Druid tool catalog served over MCP.
//!
//! Every tool is one [`DruidTool`] variant. Its name drives the read-only
//! classification, so names follow the verb-prefix convention (`list…`,
//! `show…`, `get…`, `health…`, `status…` for reads).

mod args;
mod cluster;
mod datasources;
mod lookups;
mod security;
mod sql;
mod supervisors;
mod tasks;

pub use args::Args;

use druidgate_core::engine::DruidApi;
use druidgate_core::error::Result;
use druidgate_core::policy::{DiscoveryFilter, OperationClassifier, PolicyState};
use druidgate_core::protocol::{
    OperationDescriptor, ReturnKind, ToolAnnotations, ToolDefinition, ToolOutput,
};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DruidTool {
    ListDatasources,
    ShowDatasourceDetails,
    DeleteDatasource,
    QueryDruidSql,
    ListTasks,
    TaskStatusById,
    KillTask,
    ListSupervisors,
    GetSupervisorStatus,
    SuspendSupervisor,
    ResumeSupervisor,
    TerminateSupervisor,
    ListLookups,
    CreateOrUpdateLookup,
    DeleteLookup,
    ListAuthenticationUsers,
    CreateAuthenticationUser,
    DeleteAuthenticationUser,
    HealthCheck,
    StatusServer,
}

impl DruidTool {
    /// Catalog order; `tools/list` pages through this.
    pub const ALL: [DruidTool; 20] = [
        DruidTool::ListDatasources,
        DruidTool::ShowDatasourceDetails,
        DruidTool::DeleteDatasource,
        DruidTool::QueryDruidSql,
        DruidTool::ListTasks,
        DruidTool::TaskStatusById,
        DruidTool::KillTask,
        DruidTool::ListSupervisors,
        DruidTool::GetSupervisorStatus,
        DruidTool::SuspendSupervisor,
        DruidTool::ResumeSupervisor,
        DruidTool::TerminateSupervisor,
        DruidTool::ListLookups,
        DruidTool::CreateOrUpdateLookup,
        DruidTool::DeleteLookup,
        DruidTool::ListAuthenticationUsers,
        DruidTool::CreateAuthenticationUser,
        DruidTool::DeleteAuthenticationUser,
        DruidTool::HealthCheck,
        DruidTool::StatusServer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DruidTool::ListDatasources => "listDatasources",
            DruidTool::ShowDatasourceDetails => "showDatasourceDetails",
            DruidTool::DeleteDatasource => "deleteDatasource",
            DruidTool::QueryDruidSql => "queryDruidSql",
            DruidTool::ListTasks => "listTasks",
            DruidTool::TaskStatusById => "taskStatusById",
            DruidTool::KillTask => "killTask",
            DruidTool::ListSupervisors => "listSupervisors",
            DruidTool::GetSupervisorStatus => "getSupervisorStatus",
            DruidTool::SuspendSupervisor => "suspendSupervisor",
            DruidTool::ResumeSupervisor => "resumeSupervisor",
            DruidTool::TerminateSupervisor => "terminateSupervisor",
            DruidTool::ListLookups => "listLookups",
            DruidTool::CreateOrUpdateLookup => "createOrUpdateLookup",
            DruidTool::DeleteLookup => "deleteLookup",
            DruidTool::ListAuthenticationUsers => "listAuthenticationUsers",
            DruidTool::CreateAuthenticationUser => "createAuthenticationUser",
            DruidTool::DeleteAuthenticationUser => "deleteAuthenticationUser",
            DruidTool::HealthCheck => "healthCheck",
            DruidTool::StatusServer => "statusServer",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            DruidTool::ListDatasources => "List the names of all queryable datasources.",
            DruidTool::ShowDatasourceDetails => "Show segment and tier details of a datasource.",
            DruidTool::DeleteDatasource => {
                "Mark all segments of a datasource as unused, dropping it from the cluster."
            }
            DruidTool::QueryDruidSql => "Run a Druid SQL query and return the result rows.",
            DruidTool::ListTasks => {
                "List ingestion tasks, optionally filtered by state and datasource."
            }
            DruidTool::TaskStatusById => "Get the status of one ingestion task.",
            DruidTool::KillTask => "Shut down a running ingestion task.",
            DruidTool::ListSupervisors => "List the ids of all streaming supervisors.",
            DruidTool::GetSupervisorStatus => "Get the status report of one supervisor.",
            DruidTool::SuspendSupervisor => "Suspend a supervisor, pausing its ingestion tasks.",
            DruidTool::ResumeSupervisor => "Resume a suspended supervisor.",
            DruidTool::TerminateSupervisor => {
                "Terminate a supervisor and stop all of its ingestion tasks."
            }
            DruidTool::ListLookups => "List all lookup definitions across tiers.",
            DruidTool::CreateOrUpdateLookup => "Create or replace a lookup definition in a tier.",
            DruidTool::DeleteLookup => "Delete a lookup definition from a tier.",
            DruidTool::ListAuthenticationUsers => "List users of a basic-security authenticator.",
            DruidTool::CreateAuthenticationUser => {
                "Create a basic-security user, optionally setting its password."
            }
            DruidTool::DeleteAuthenticationUser => "Delete a basic-security user.",
            DruidTool::HealthCheck => "Check whether the Druid router is healthy.",
            DruidTool::StatusServer => "Get version and module information of the Druid router.",
        }
    }

    pub fn return_kind(self) -> ReturnKind {
        match self {
            DruidTool::TerminateSupervisor | DruidTool::DeleteLookup | DruidTool::StatusServer => {
                ReturnKind::Structured
            }
            _ => ReturnKind::Text,
        }
    }

    pub fn descriptor(self) -> OperationDescriptor {
        OperationDescriptor::new(self.name(), self.return_kind())
    }

    /// JSON Schema for the tool's `arguments`.
    pub fn input_schema(self) -> Value {
        match self {
            DruidTool::ListDatasources
            | DruidTool::ListSupervisors
            | DruidTool::ListLookups
            | DruidTool::HealthCheck
            | DruidTool::StatusServer => object_schema(json!({}), &[]),
            DruidTool::ShowDatasourceDetails | DruidTool::DeleteDatasource => object_schema(
                json!({"datasource": {"type": "string", "description": "Datasource name"}}),
                &["datasource"],
            ),
            DruidTool::QueryDruidSql => object_schema(
                json!({
                    "query": {"type": "string", "description": "Druid SQL statement"},
                    "resultFormat": {
                        "type": "string",
                        "enum": sql::RESULT_FORMATS,
                        "description": "Row encoding (default: object)"
                    },
                    "context": {"type": "object", "description": "Query context parameters"}
                }),
                &["query"],
            ),
            DruidTool::ListTasks => object_schema(
                json!({
                    "state": {"type": "string", "enum": tasks::TASK_STATES},
                    "datasource": {"type": "string"}
                }),
                &[],
            ),
            DruidTool::TaskStatusById | DruidTool::KillTask => object_schema(
                json!({"taskId": {"type": "string", "description": "Ingestion task id"}}),
                &["taskId"],
            ),
            DruidTool::GetSupervisorStatus
            | DruidTool::SuspendSupervisor
            | DruidTool::ResumeSupervisor
            | DruidTool::TerminateSupervisor => object_schema(
                json!({"supervisorId": {"type": "string", "description": "Supervisor id"}}),
                &["supervisorId"],
            ),
            DruidTool::CreateOrUpdateLookup => object_schema(
                json!({
                    "tier": {"type": "string"},
                    "name": {"type": "string"},
                    "spec": {
                        "type": "object",
                        "description": "Lookup spec with version and lookupExtractorFactory"
                    }
                }),
                &["tier", "name", "spec"],
            ),
            DruidTool::DeleteLookup => object_schema(
                json!({"tier": {"type": "string"}, "name": {"type": "string"}}),
                &["tier", "name"],
            ),
            DruidTool::ListAuthenticationUsers => object_schema(
                json!({"authenticator": authenticator_schema()}),
                &[],
            ),
            DruidTool::CreateAuthenticationUser => object_schema(
                json!({
                    "authenticator": authenticator_schema(),
                    "username": {"type": "string"},
                    "password": {"type": "string"}
                }),
                &["username"],
            ),
            DruidTool::DeleteAuthenticationUser => object_schema(
                json!({
                    "authenticator": authenticator_schema(),
                    "username": {"type": "string"}
                }),
                &["username"],
            ),
        }
    }

    /// Listing entry; `readOnlyHint` mirrors the classifier's verdict.
    pub fn definition(self, classifier: &OperationClassifier) -> ToolDefinition {
        let read_only = classifier.is_read_only(self.name());
        ToolDefinition {
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(read_only),
                destructive_hint: Some(!read_only),
            }),
        }
    }

    /// Run the tool against the engine.
    ///
    /// Policy is not checked here; callers go through
    /// [`InvocationGuard::invoke`](druidgate_core::policy::InvocationGuard::invoke).
    pub async fn execute(
        self,
        engine: &dyn DruidApi,
        arguments: Option<&Value>,
    ) -> Result<ToolOutput> {
        let args = Args::new(self.name(), arguments)?;
        match self {
            DruidTool::ListDatasources => datasources::list(engine).await,
            DruidTool::ShowDatasourceDetails => datasources::show(engine, &args).await,
            DruidTool::DeleteDatasource => datasources::delete(engine, &args).await,
            DruidTool::QueryDruidSql => sql::query(engine, &args).await,
            DruidTool::ListTasks => tasks::list(engine, &args).await,
            DruidTool::TaskStatusById => tasks::status(engine, &args).await,
            DruidTool::KillTask => tasks::kill(engine, &args).await,
            DruidTool::ListSupervisors => supervisors::list(engine).await,
            DruidTool::GetSupervisorStatus => supervisors::status(engine, &args).await,
            DruidTool::SuspendSupervisor => supervisors::suspend(engine, &args).await,
            DruidTool::ResumeSupervisor => supervisors::resume(engine, &args).await,
            DruidTool::TerminateSupervisor => supervisors::terminate(engine, &args).await,
            DruidTool::ListLookups => lookups::list(engine).await,
            DruidTool::CreateOrUpdateLookup => lookups::create_or_update(engine, &args).await,
            DruidTool::DeleteLookup => lookups::delete(engine, &args).await,
            DruidTool::ListAuthenticationUsers => security::list_users(engine, &args).await,
            DruidTool::CreateAuthenticationUser => security::create_user(engine, &args).await,
            DruidTool::DeleteAuthenticationUser => security::delete_user(engine, &args).await,
            DruidTool::HealthCheck => cluster::health(engine).await,
            DruidTool::StatusServer => cluster::status(engine).await,
        }
    }
}

/// The whole catalog as an untyped `{"tools": [...]}` document, filtered the
/// same way `tools/list` is.
pub fn catalog_json(policy: PolicyState) -> Value {
    let classifier = OperationClassifier::new();
    let tools: Vec<Value> = DruidTool::ALL
        .iter()
        .filter_map(|tool| serde_json::to_value(tool.definition(&classifier)).ok())
        .collect();
    DiscoveryFilter::new(policy, classifier).filter(json!({ "tools": tools }))
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn authenticator_schema() -> Value {
    json!({
        "type": "string",
        "description": format!("Authenticator name (default: {})", security::DEFAULT_AUTHENTICATOR)
    })
}

/// Parse an engine body for a structured tool; non-JSON bodies are wrapped.
pub(crate) fn structured(body: String) -> ToolOutput {
    if body.trim().is_empty() {
        return ToolOutput::Structured(json!({}));
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(value @ Value::Object(_)) => ToolOutput::Structured(value),
        Ok(other) => ToolOutput::Structured(json!({ "result": other })),
        Err(_) => ToolOutput::Structured(json!({ "result": body })),
    }
}
