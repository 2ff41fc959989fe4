use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::service::ServiceInfo;

/// Document that owns a variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VariableParent<'a> {
    Task(&'a str),
    ProcessInstance(&'a str),
}

/// Anything that identifies a variable and its parent document.
///
/// Implemented by the stored [`Variable`] and by the variable payloads carried
/// on runtime events, so both can drive parent resolution.
pub trait VariableScope {
    fn name(&self) -> &str;

    fn variable_type(&self) -> &str;

    fn process_instance_id(&self) -> Option<&str>;

    fn task_id(&self) -> Option<&str>;

    /// A variable is task-scoped iff it carries a task id.
    fn is_task_variable(&self) -> bool {
        self.task_id().is_some()
    }

    fn parent(&self) -> VariableParent<'_> {
        match self.task_id() {
            Some(task_id) => VariableParent::Task(task_id),
            None => VariableParent::ProcessInstance(self.process_instance_id().unwrap_or_default()),
        }
    }
}

/// A process or task variable as stored inside a parent document.
///
/// Identity within a bucket is the `name`; every other field may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub variable_type: String,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub process_instance_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub marked_as_deleted: bool,
    #[serde(flatten)]
    pub service: ServiceInfo,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        variable_type: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        Self {
            name: name.into(),
            variable_type: variable_type.into(),
            value: value.into(),
            process_instance_id: None,
            task_id: None,
            created_time: None,
            last_updated_time: None,
            marked_as_deleted: false,
            service: ServiceInfo::default(),
        }
    }

    pub fn with_process_instance_id(mut self, process_instance_id: impl Into<String>) -> Self {
        self.process_instance_id = Some(process_instance_id.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_last_updated_time(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated_time = Some(at);
        self
    }
}

impl VariableScope for Variable {
    fn name(&self) -> &str {
        &self.name
    }

    fn variable_type(&self) -> &str {
        &self.variable_type
    }

    fn process_instance_id(&self) -> Option<&str> {
        self.process_instance_id.as_deref()
    }

    fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }
}
