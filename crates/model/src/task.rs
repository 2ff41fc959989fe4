use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowquery_core::Document;

use crate::buckets::{self, VariableBuckets};
use crate::service::ServiceInfo;

/// Task lifecycle as seen by the query side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created,
    Assigned,
    Suspended,
    Completed,
    Cancelled,
    Deleted,
}

/// Queryable task document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
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
    pub status: TaskStatus,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub service: ServiceInfo,
    #[serde(default, deserialize_with = "buckets::nullable")]
    pub variables: VariableBuckets,
}

impl Task {
    /// A bare document in `CREATED` state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            assignee: None,
            owner: None,
            priority: 0,
            created_date: None,
            due_date: None,
            claimed_date: None,
            process_definition_id: None,
            process_instance_id: None,
            parent_task_id: None,
            status: TaskStatus::Created,
            last_modified: None,
            service: ServiceInfo::default(),
            variables: VariableBuckets::new(),
        }
    }

    /// Set the claim details and move to ASSIGNED, whatever the current state.
    pub fn assign(
        &mut self,
        assignee: Option<String>,
        owner: Option<String>,
        claimed_date: Option<DateTime<Utc>>,
        service: ServiceInfo,
        at: DateTime<Utc>,
    ) {
        self.assignee = assignee;
        self.owner = owner;
        self.claimed_date = claimed_date;
        self.service = service;
        self.status = TaskStatus::Assigned;
        self.last_modified = Some(at);
    }

    pub fn suspend(&mut self, at: DateTime<Utc>) {
        self.transition(TaskStatus::Suspended, at);
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.transition(TaskStatus::Completed, at);
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.transition(TaskStatus::Cancelled, at);
    }

    fn transition(&mut self, status: TaskStatus, at: DateTime<Utc>) {
        self.status = status;
        self.last_modified = Some(at);
    }
}

impl Document for Task {
    const KIND: &'static str = "task";

    fn id(&self) -> &str {
        &self.id
    }
}
