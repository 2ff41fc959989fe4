use chrono::{DateTime, Utc};
use tracing::debug;

use flowquery_core::{QueryError, QueryResult};
use flowquery_events::{event_types, EventEnvelope, ProcessInstancePayload, RuntimeEvent};
use flowquery_model::{ProcessInstance, ProcessInstanceStatus, ServiceInfo};

use super::{unexpected, QueryEventHandler};
use crate::config::IndexesConfig;
use crate::read_model::{
    DocumentFinder, DocumentRepository, DocumentStore, ProcessInstanceRepository, Repository,
};

fn new_process_instance(
    payload: &ProcessInstancePayload,
    service: &ServiceInfo,
    at: DateTime<Utc>,
) -> ProcessInstance {
    let mut pi = ProcessInstance::new(payload.id.clone());
    pi.name = payload.name.clone();
    pi.description = payload.description.clone();
    pi.process_definition_id = payload.process_definition_id.clone();
    pi.process_definition_key = payload.process_definition_key.clone();
    pi.initiator = payload.initiator.clone();
    pi.business_key = payload.business_key.clone();
    pi.start_date = payload.start_date;
    pi.status = ProcessInstanceStatus::Created;
    pi.service = service.clone();
    pi.last_modified = Some(at);
    pi
}

/// Stores the first version of a process-instance document.
pub struct ProcessCreatedHandler<S> {
    repository: ProcessInstanceRepository<S>,
}

impl<S: DocumentStore> ProcessCreatedHandler<S> {
    pub fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            repository: DocumentRepository::new(store, &indexes.process_instance_index),
        }
    }
}

impl<S: DocumentStore> QueryEventHandler for ProcessCreatedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::PROCESS_CREATED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::ProcessCreated(payload) = event.payload() else {
            return Err(unexpected("ProcessCreatedHandler", event.payload()));
        };
        debug!(process_instance_id = %payload.id, "handling process created");

        let pi = new_process_instance(payload, event.service(), event.timestamp());
        self.repository
            .save(&pi)
            .map_err(|e| QueryError::persistence(format!("Error handling ProcessCreatedEvent[{event:?}]"), e))
    }
}

/// Read, transition, save. The transition reports whether anything changed;
/// unchanged documents are not written back.
struct Lifecycle<S> {
    repository: ProcessInstanceRepository<S>,
    finder: DocumentFinder,
}

impl<S: DocumentStore> Lifecycle<S> {
    fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            repository: DocumentRepository::new(store, &indexes.process_instance_index),
            finder: DocumentFinder::new(),
        }
    }

    fn apply(
        &self,
        id: &str,
        transition: impl FnOnce(&mut ProcessInstance) -> bool,
    ) -> QueryResult<()> {
        let mut pi: ProcessInstance = self.finder.find_by_id(
            &self.repository,
            id,
            format!("Unable to find process instance with the given id: {id}"),
        )?;

        if !transition(&mut pi) {
            debug!(process_instance_id = %id, status = ?pi.status, "status unchanged, skipping write");
            return Ok(());
        }

        self.repository.save(&pi).map_err(|e| {
            QueryError::persistence(format!("Unable to save process instance with the given id: {id}"), e)
        })
    }
}

/// CREATED -> RUNNING. Replays against a more advanced status are ignored.
pub struct ProcessStartedHandler<S> {
    lifecycle: Lifecycle<S>,
}

impl<S: DocumentStore> ProcessStartedHandler<S> {
    pub fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(store, indexes),
        }
    }
}

impl<S: DocumentStore> QueryEventHandler for ProcessStartedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::PROCESS_STARTED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::ProcessStarted(payload) = event.payload() else {
            return Err(unexpected("ProcessStartedHandler", event.payload()));
        };
        debug!(process_instance_id = %payload.id, "handling process started");

        let at = event.timestamp();
        self.lifecycle.apply(&payload.id, |pi| pi.start(at))
    }
}

pub struct ProcessSuspendedHandler<S> {
    lifecycle: Lifecycle<S>,
}

impl<S: DocumentStore> ProcessSuspendedHandler<S> {
    pub fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(store, indexes),
        }
    }
}

impl<S: DocumentStore> QueryEventHandler for ProcessSuspendedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::PROCESS_SUSPENDED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::ProcessSuspended(payload) = event.payload() else {
            return Err(unexpected("ProcessSuspendedHandler", event.payload()));
        };
        debug!(process_instance_id = %payload.id, "handling process suspended");

        let at = event.timestamp();
        self.lifecycle.apply(&payload.id, |pi| {
            pi.suspend(at);
            true
        })
    }
}

/// SUSPENDED -> RUNNING, no-op from any other status.
pub struct ProcessResumedHandler<S> {
    lifecycle: Lifecycle<S>,
}

impl<S: DocumentStore> ProcessResumedHandler<S> {
    pub fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(store, indexes),
        }
    }
}

impl<S: DocumentStore> QueryEventHandler for ProcessResumedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::PROCESS_RESUMED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::ProcessResumed(payload) = event.payload() else {
            return Err(unexpected("ProcessResumedHandler", event.payload()));
        };
        debug!(process_instance_id = %payload.id, "handling process resumed");

        let at = event.timestamp();
        self.lifecycle.apply(&payload.id, |pi| pi.resume(at))
    }
}

pub struct ProcessCompletedHandler<S> {
    lifecycle: Lifecycle<S>,
}

impl<S: DocumentStore> ProcessCompletedHandler<S> {
    pub fn new(store: S, indexes: &IndexesConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(store, indexes),
        }
    }
}

impl<S: DocumentStore> QueryEventHandler for ProcessCompletedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::PROCESS_COMPLETED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::ProcessCompleted(payload) = event.payload() else {
            return Err(unexpected("ProcessCompletedHandler", event.payload()));
        };
        debug!(process_instance_id = %payload.id, "handling process completed");

        let at = event.timestamp();
        self.lifecycle.apply(&payload.id, |pi| {
            pi.complete(at);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::store::testing::ReadOnlyStore;
    use crate::read_model::InMemoryDocumentStore;
    use chrono::TimeZone;
    use flowquery_events::TaskPayload;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn envelope(event: RuntimeEvent, secs: i64) -> EventEnvelope<RuntimeEvent> {
        EventEnvelope::from_payload(event).with_timestamp(at(secs))
    }

    fn setup() -> (Arc<InMemoryDocumentStore>, ProcessInstanceRepository<Arc<InMemoryDocumentStore>>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = DocumentRepository::new(store.clone(), "process_instance");
        (store, repo)
    }

    fn seed(repo: &ProcessInstanceRepository<Arc<InMemoryDocumentStore>>, status: ProcessInstanceStatus) {
        let mut pi = ProcessInstance::new("P1");
        pi.status = status;
        pi.last_modified = Some(at(1));
        repo.save(&pi).unwrap();
    }

    fn load(repo: &ProcessInstanceRepository<Arc<InMemoryDocumentStore>>) -> ProcessInstance {
        repo.find_by_id("P1").unwrap().unwrap()
    }

    #[test]
    fn created_stores_document_with_envelope_metadata() {
        let (store, repo) = setup();
        let handler = ProcessCreatedHandler::new(store, &IndexesConfig::default());

        let mut payload = ProcessInstancePayload::new("P1");
        payload.business_key = Some("order-7".to_string());
        let env = envelope(RuntimeEvent::ProcessCreated(payload), 10)
            .with_service(ServiceInfo::named("rb-my-app"));
        handler.handle(&env).unwrap();

        let pi = load(&repo);
        assert_eq!(pi.status, ProcessInstanceStatus::Created);
        assert_eq!(pi.business_key.as_deref(), Some("order-7"));
        assert_eq!(pi.last_modified, Some(at(10)));
        assert_eq!(pi.service.service_name.as_deref(), Some("rb-my-app"));
        assert!(pi.variables.is_empty());
    }

    #[test]
    fn created_wraps_save_failure() {
        let handler = ProcessCreatedHandler::new(Arc::new(ReadOnlyStore::default()), &IndexesConfig::default());
        let env = envelope(RuntimeEvent::ProcessCreated(ProcessInstancePayload::new("P1")), 10);

        let err = handler.handle(&env).unwrap_err();

        assert!(matches!(err, QueryError::Persistence { .. }));
        assert!(err.to_string().starts_with("Error handling ProcessCreatedEvent["));
    }

    #[test]
    fn started_moves_created_to_running() {
        let (store, repo) = setup();
        seed(&repo, ProcessInstanceStatus::Created);
        let handler = ProcessStartedHandler::new(store, &IndexesConfig::default());

        handler
            .handle(&envelope(RuntimeEvent::ProcessStarted(ProcessInstancePayload::new("P1")), 20))
            .unwrap();

        let pi = load(&repo);
        assert_eq!(pi.status, ProcessInstanceStatus::Running);
        assert_eq!(pi.last_modified, Some(at(20)));
    }

    #[test]
    fn started_is_ignored_once_past_created() {
        for status in [
            ProcessInstanceStatus::Running,
            ProcessInstanceStatus::Suspended,
            ProcessInstanceStatus::Completed,
        ] {
            let (store, repo) = setup();
            seed(&repo, status);
            let handler = ProcessStartedHandler::new(store, &IndexesConfig::default());

            handler
                .handle(&envelope(RuntimeEvent::ProcessStarted(ProcessInstancePayload::new("P1")), 20))
                .unwrap();

            let pi = load(&repo);
            assert_eq!(pi.status, status);
            assert_eq!(pi.last_modified, Some(at(1)));
        }
    }

    #[test]
    fn started_fails_for_unknown_process_instance() {
        let (store, _repo) = setup();
        let handler = ProcessStartedHandler::new(store, &IndexesConfig::default());

        let err = handler
            .handle(&envelope(RuntimeEvent::ProcessStarted(ProcessInstancePayload::new("P9")), 20))
            .unwrap_err();

        assert!(matches!(err, QueryError::NotFound(_)));
        assert_eq!(err.to_string(), "Unable to find process instance with the given id: P9");
    }

    #[test]
    fn suspended_applies_from_any_status() {
        let (store, repo) = setup();
        seed(&repo, ProcessInstanceStatus::Completed);
        let handler = ProcessSuspendedHandler::new(store, &IndexesConfig::default());

        handler
            .handle(&envelope(RuntimeEvent::ProcessSuspended(ProcessInstancePayload::new("P1")), 30))
            .unwrap();

        let pi = load(&repo);
        assert_eq!(pi.status, ProcessInstanceStatus::Suspended);
        assert_eq!(pi.last_modified, Some(at(30)));
    }

    #[test]
    fn resumed_only_leaves_suspended() {
        let (store, repo) = setup();
        seed(&repo, ProcessInstanceStatus::Suspended);
        let handler = ProcessResumedHandler::new(store, &IndexesConfig::default());
        let env = envelope(RuntimeEvent::ProcessResumed(ProcessInstancePayload::new("P1")), 40);

        handler.handle(&env).unwrap();
        assert_eq!(load(&repo).status, ProcessInstanceStatus::Running);

        // Replay is harmless.
        handler.handle(&env.clone().with_timestamp(at(50))).unwrap();
        assert_eq!(load(&repo).last_modified, Some(at(40)));
    }

    #[test]
    fn completed_keeps_variables() {
        let (store, repo) = setup();
        let mut pi = ProcessInstance::new("P1");
        pi.variables
            .upsert(flowquery_model::Variable::new("amount", "integer", 3).with_process_instance_id("P1"));
        repo.save(&pi).unwrap();
        let handler = ProcessCompletedHandler::new(store, &IndexesConfig::default());

        handler
            .handle(&envelope(RuntimeEvent::ProcessCompleted(ProcessInstancePayload::new("P1")), 60))
            .unwrap();

        let pi = load(&repo);
        assert_eq!(pi.status, ProcessInstanceStatus::Completed);
        assert!(pi.variables.find("integer", "amount").is_some());
    }

    #[test]
    fn handler_rejects_other_event_kinds() {
        let (store, _repo) = setup();
        let handler = ProcessStartedHandler::new(store, &IndexesConfig::default());

        let err = handler
            .handle(&envelope(RuntimeEvent::TaskCreated(TaskPayload::new("T1")), 1))
            .unwrap_err();

        match err {
            QueryError::UnexpectedEvent { handler, found } => {
                assert_eq!(handler, "ProcessStartedHandler");
                assert_eq!(found, "TASK_CREATED");
            }
            other => panic!("Expected UnexpectedEvent, got {other:?}"),
        }
    }
}
