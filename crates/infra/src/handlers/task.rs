use chrono::{DateTime, Utc};
use tracing::debug;

use flowquery_core::{QueryError, QueryResult};
use flowquery_events::{event_types, Event, EventEnvelope, RuntimeEvent, TaskPayload};
use flowquery_model::{ServiceInfo, Task, TaskStatus};

use super::{unexpected, QueryEventHandler};
use crate::config::IndexesConfig;
use crate::read_model::{DocumentFinder, DocumentRepository, DocumentStore, Repository, TaskRepository};

fn new_task(payload: &TaskPayload, service: &ServiceInfo, at: DateTime<Utc>) -> Task {
    let mut task = Task::new(payload.id.clone());
    task.name = payload.name.clone();
    task.description = payload.description.clone();
    task.assignee = payload.assignee.clone();
    task.owner = payload.owner.clone();
    task.priority = payload.priority;
    task.created_date = payload.created_date;
    task.due_date = payload.due_date;
    task.claimed_date = payload.claimed_date;
    task.process_definition_id = payload.process_definition_id.clone();
    task.process_instance_id = payload.process_instance_id.clone();
    task.parent_task_id = payload.parent_task_id.clone();
    task.status = TaskStatus::Created;
    task.service = service.clone();
    task.last_modified = Some(at);
    task
}

pub struct TaskCreatedHandler<S> {
    repository: TaskRepository<S>,
}

impl<S: DocumentStore> TaskCreatedHandler<S> {
    pub fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            repository: DocumentRepository::new(store, &indexes.task_index),
        }
    }
}

impl<S: DocumentStore> QueryEventHandler for TaskCreatedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::TASK_CREATED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::TaskCreated(payload) = event.payload() else {
            return Err(unexpected("TaskCreatedHandler", event.payload()));
        };
        debug!(task_id = %payload.id, "handling task created");

        let task = new_task(payload, event.service(), event.timestamp());
        self.repository
            .save(&task)
            .map_err(|e| QueryError::persistence(format!("Error handling TaskCreatedEvent[{event:?}]"), e))
    }
}

/// Load the task, let `update` change it and save it back.
fn update_task<S: DocumentStore>(
    repository: &TaskRepository<S>,
    id: &str,
    update: impl FnOnce(&mut Task),
) -> QueryResult<()> {
    let mut task: Task =
        DocumentFinder::new().find_by_id(repository, id, format!("Unable to find task with id: {id}"))?;
    update(&mut task);
    repository
        .save(&task)
        .map_err(|e| QueryError::persistence(format!("Unable to save task with the given id: {id}"), e))
}

/// Claim details always overwrite what the document holds.
pub struct TaskAssignedHandler<S> {
    repository: TaskRepository<S>,
}

impl<S: DocumentStore> TaskAssignedHandler<S> {
    pub fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            repository: DocumentRepository::new(store, &indexes.task_index),
        }
    }
}

impl<S: DocumentStore> QueryEventHandler for TaskAssignedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::TASK_ASSIGNED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::TaskAssigned(payload) = event.payload() else {
            return Err(unexpected("TaskAssignedHandler", event.payload()));
        };
        debug!(task_id = %payload.id, assignee = ?payload.assignee, "handling task assigned");

        update_task(&self.repository, &payload.id, |task| {
            task.assign(
                payload.assignee.clone(),
                payload.owner.clone(),
                payload.claimed_date,
                event.service().clone(),
                event.timestamp(),
            )
        })
    }
}

/// Status-only transitions: SUSPENDED, COMPLETED and CANCELLED are applied
/// unconditionally.
pub struct TaskStatusHandler<S> {
    event_type: &'static str,
    transition: fn(&mut Task, DateTime<Utc>),
    repository: TaskRepository<S>,
}

impl<S: DocumentStore> TaskStatusHandler<S> {
    fn for_event(
        event_type: &'static str,
        transition: fn(&mut Task, DateTime<Utc>),
        store: S,
        indexes: &IndexesConfig,
    ) -> Self {
        Self {
            event_type,
            transition,
            repository: DocumentRepository::new(store, &indexes.task_index),
        }
    }

    pub fn suspended(store: S, indexes: &IndexesConfig) -> Self {
        Self::for_event(event_types::TASK_SUSPENDED, Task::suspend, store, indexes)
    }

    pub fn completed(store: S, indexes: &IndexesConfig) -> Self {
        Self::for_event(event_types::TASK_COMPLETED, Task::complete, store, indexes)
    }

    pub fn cancelled(store: S, indexes: &IndexesConfig) -> Self {
        Self::for_event(event_types::TASK_CANCELLED, Task::cancel, store, indexes)
    }
}

impl<S: DocumentStore> QueryEventHandler for TaskStatusHandler<S> {
    fn handled_event(&self) -> &'static str {
        self.event_type
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let payload = match event.payload() {
            RuntimeEvent::TaskSuspended(p)
            | RuntimeEvent::TaskCompleted(p)
            | RuntimeEvent::TaskCancelled(p)
                if event.payload().event_type() == self.event_type =>
            {
                p
            }
            other => return Err(unexpected("TaskStatusHandler", other)),
        };
        debug!(task_id = %payload.id, event_type = self.event_type, "handling task status change");

        let at = event.timestamp();
        update_task(&self.repository, &payload.id, |task| (self.transition)(task, at))
    }
}
