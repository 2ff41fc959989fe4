//! Payloads of the runtime events the query side projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use flowquery_model::VariableScope;

use crate::event::Event;

/// Event-type names as emitted by the process engine.
pub mod event_types {
    pub const PROCESS_CREATED: &str = "PROCESS_CREATED";
    pub const PROCESS_STARTED: &str = "PROCESS_STARTED";
    pub const PROCESS_SUSPENDED: &str = "PROCESS_SUSPENDED";
    pub const PROCESS_RESUMED: &str = "PROCESS_RESUMED";
    pub const PROCESS_COMPLETED: &str = "PROCESS_COMPLETED";

    pub const TASK_CREATED: &str = "TASK_CREATED";
    pub const TASK_ASSIGNED: &str = "TASK_ASSIGNED";
    pub const TASK_SUSPENDED: &str = "TASK_SUSPENDED";
    pub const TASK_COMPLETED: &str = "TASK_COMPLETED";
    pub const TASK_CANCELLED: &str = "TASK_CANCELLED";

    pub const VARIABLE_CREATED: &str = "VARIABLE_CREATED";
    pub const VARIABLE_UPDATED: &str = "VARIABLE_UPDATED";
    pub const VARIABLE_DELETED: &str = "VARIABLE_DELETED";
}

/// Process instance as described by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstancePayload {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub process_definition_id: Option<String>,
    #[serde(default)]
    pub process_definition_key: Option<String>,
    #[serde(default)]
    pub initiator: Option<String>,
    #[serde(default)]
    pub business_key: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

impl ProcessInstancePayload {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Task as described by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub claimed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub process_definition_id: Option<String>,
    #[serde(default)]
    pub process_instance_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
}

impl TaskPayload {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Variable instance as described by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablePayload {
    pub name: String,
    #[serde(rename = "type")]
    pub variable_type: String,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub process_instance_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl VariablePayload {
    pub fn new(
        name: impl Into<String>,
        variable_type: impl Into<String>,
        value: impl Into<JsonValue>,
        process_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            variable_type: variable_type.into(),
            value: value.into(),
            process_instance_id: Some(process_instance_id.into()),
            task_id: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

impl VariableScope for VariablePayload {
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

/// Every runtime event the query side knows how to project.
///
/// The serialized form carries the event-type name next to the entity, e.g.
/// `{"eventType": "TASK_CREATED", "entity": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "entity")]
pub enum RuntimeEvent {
    #[serde(rename = "PROCESS_CREATED")]
    ProcessCreated(ProcessInstancePayload),
    #[serde(rename = "PROCESS_STARTED")]
    ProcessStarted(ProcessInstancePayload),
    #[serde(rename = "PROCESS_SUSPENDED")]
    ProcessSuspended(ProcessInstancePayload),
    #[serde(rename = "PROCESS_RESUMED")]
    ProcessResumed(ProcessInstancePayload),
    #[serde(rename = "PROCESS_COMPLETED")]
    ProcessCompleted(ProcessInstancePayload),

    #[serde(rename = "TASK_CREATED")]
    TaskCreated(TaskPayload),
    #[serde(rename = "TASK_ASSIGNED")]
    TaskAssigned(TaskPayload),
    #[serde(rename = "TASK_SUSPENDED")]
    TaskSuspended(TaskPayload),
    #[serde(rename = "TASK_COMPLETED")]
    TaskCompleted(TaskPayload),
    #[serde(rename = "TASK_CANCELLED")]
    TaskCancelled(TaskPayload),

    #[serde(rename = "VARIABLE_CREATED")]
    VariableCreated(VariablePayload),
    #[serde(rename = "VARIABLE_UPDATED")]
    VariableUpdated(VariablePayload),
    #[serde(rename = "VARIABLE_DELETED")]
    VariableDeleted(VariablePayload),
}

impl RuntimeEvent {
    /// Id of the entity the event is about (variable events use the name).
    pub fn entity_id(&self) -> &str {
        match self {
            RuntimeEvent::ProcessCreated(p)
            | RuntimeEvent::ProcessStarted(p)
            | RuntimeEvent::ProcessSuspended(p)
            | RuntimeEvent::ProcessResumed(p)
            | RuntimeEvent::ProcessCompleted(p) => &p.id,
            RuntimeEvent::TaskCreated(t)
            | RuntimeEvent::TaskAssigned(t)
            | RuntimeEvent::TaskSuspended(t)
            | RuntimeEvent::TaskCompleted(t)
            | RuntimeEvent::TaskCancelled(t) => &t.id,
            RuntimeEvent::VariableCreated(v)
            | RuntimeEvent::VariableUpdated(v)
            | RuntimeEvent::VariableDeleted(v) => &v.name,
        }
    }
}

impl Event for RuntimeEvent {
    fn event_type(&self) -> &'static str {
        use event_types::*;
        match self {
            RuntimeEvent::ProcessCreated(_) => PROCESS_CREATED,
            RuntimeEvent::ProcessStarted(_) => PROCESS_STARTED,
            RuntimeEvent::ProcessSuspended(_) => PROCESS_SUSPENDED,
            RuntimeEvent::ProcessResumed(_) => PROCESS_RESUMED,
            RuntimeEvent::ProcessCompleted(_) => PROCESS_COMPLETED,
            RuntimeEvent::TaskCreated(_) => TASK_CREATED,
            RuntimeEvent::TaskAssigned(_) => TASK_ASSIGNED,
            RuntimeEvent::TaskSuspended(_) => TASK_SUSPENDED,
            RuntimeEvent::TaskCompleted(_) => TASK_COMPLETED,
            RuntimeEvent::TaskCancelled(_) => TASK_CANCELLED,
            RuntimeEvent::VariableCreated(_) => VARIABLE_CREATED,
            RuntimeEvent::VariableUpdated(_) => VARIABLE_UPDATED,
            RuntimeEvent::VariableDeleted(_) => VARIABLE_DELETED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventEnvelope;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn wire_tag_matches_event_type() {
        let event = RuntimeEvent::TaskAssigned(TaskPayload::new("T1"));
        let wire = serde_json::to_value(&event).unwrap();

        assert_eq!(wire["eventType"], json!(event.event_type()));
        assert_eq!(wire["entity"]["id"], json!("T1"));
        assert_eq!(event.entity_id(), "T1");
    }

    #[test]
    fn envelope_reads_producer_json() {
        let wire = json!({
            "eventId": "018f3c2e-6d1a-7c3b-9a4e-1f2d3c4b5a69",
            "timestamp": 1_700_000_000_123i64,
            "serviceName": "rb-a",
            "appName": "default-app",
            "payload": {
                "eventType": "VARIABLE_CREATED",
                "entity": {
                    "name": "amount",
                    "type": "integer",
                    "value": 10,
                    "processInstanceId": "P1"
                }
            }
        });

        let env: EventEnvelope<RuntimeEvent> = serde_json::from_value(wire).unwrap();

        assert_eq!(
            env.timestamp(),
            Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
        );
        assert_eq!(env.service().service_name.as_deref(), Some("rb-a"));
        assert_eq!(env.service().app_name.as_deref(), Some("default-app"));
        match env.payload() {
            RuntimeEvent::VariableCreated(v) => {
                assert_eq!(v.name, "amount");
                assert_eq!(v.value, json!(10));
                assert!(!v.is_task_variable());
                assert_eq!(env.payload().entity_id(), "amount");
            }
            other => panic!("Expected VariableCreated, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let wire = json!({ "eventType": "process_started", "entity": { "id": "P1" } });
        assert!(serde_json::from_value::<RuntimeEvent>(wire).is_err());
    }
}
