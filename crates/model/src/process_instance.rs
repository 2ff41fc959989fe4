use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowquery_core::Document;

use crate::buckets::{self, VariableBuckets};
use crate::service::ServiceInfo;

/// Process instance lifecycle as seen by the query side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessInstanceStatus {
    Created,
    Running,
    Suspended,
    Cancelled,
    Completed,
}

/// Queryable process instance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
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
    pub status: ProcessInstanceStatus,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub service: ServiceInfo,
    #[serde(default, deserialize_with = "buckets::nullable")]
    pub variables: VariableBuckets,
}

impl ProcessInstance {
    /// A bare document in `CREATED` state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            process_definition_id: None,
            process_definition_key: None,
            initiator: None,
            business_key: None,
            start_date: None,
            status: ProcessInstanceStatus::Created,
            last_modified: None,
            service: ServiceInfo::default(),
            variables: VariableBuckets::new(),
        }
    }

    /// CREATED -> RUNNING. Any other state is left untouched so replayed
    /// events cannot roll back a more advanced status.
    ///
    /// Returns whether the document changed.
    pub fn start(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != ProcessInstanceStatus::Created {
            return false;
        }
        self.status = ProcessInstanceStatus::Running;
        self.last_modified = Some(at);
        true
    }

    pub fn suspend(&mut self, at: DateTime<Utc>) {
        self.status = ProcessInstanceStatus::Suspended;
        self.last_modified = Some(at);
    }

    /// SUSPENDED -> RUNNING; no-op otherwise.
    pub fn resume(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != ProcessInstanceStatus::Suspended {
            return false;
        }
        self.status = ProcessInstanceStatus::Running;
        self.last_modified = Some(at);
        true
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = ProcessInstanceStatus::Completed;
        self.last_modified = Some(at);
    }
}

impl Document for ProcessInstance {
    const KIND: &'static str = "process instance";

    fn id(&self) -> &str {
        &self.id
    }
}
