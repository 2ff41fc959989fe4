//! Routes runtime events to the handler registered for their event type.
//!
//! ```text
//! EventEnvelope<RuntimeEvent> → event_type() → QueryEventHandler::handle → DocumentStore
//! ```
//!
//! Routing is an exact, case-sensitive match on the event-type name. Events
//! without a handler are skipped: the query side only projects what it knows.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use flowquery_core::{QueryError, QueryResult};
use flowquery_events::{Event, EventEnvelope, RuntimeEvent};

use crate::config::IndexesConfig;
use crate::handlers::{
    ProcessCompletedHandler, ProcessCreatedHandler, ProcessResumedHandler, ProcessStartedHandler,
    ProcessSuspendedHandler, QueryEventHandler, TaskAssignedHandler, TaskCreatedHandler,
    TaskStatusHandler, VariableCreatedHandler, VariableDeletedHandler, VariableUpdatedHandler,
};
use crate::read_model::DocumentStore;
use crate::variable_updater::VariableUpdater;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// No handler is registered for the event type.
    NoHandler,
}

/// A failed event from [`QueryEventDispatcher::dispatch_all`].
#[derive(Debug)]
pub struct DispatchFailure {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub error: QueryError,
}

#[derive(Default)]
pub struct QueryEventDispatcher {
    handlers: HashMap<&'static str, Box<dyn QueryEventHandler>>,
}

impl QueryEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every handler of the query side, all writing to `store`.
    pub fn with_default_handlers<S>(store: S, indexes: IndexesConfig) -> Self
    where
        S: DocumentStore + Clone + 'static,
    {
        let updater = Arc::new(VariableUpdater::new(store.clone(), indexes.clone()));

        Self::new()
            .with_handler(ProcessCreatedHandler::new(store.clone(), &indexes))
            .with_handler(ProcessStartedHandler::new(store.clone(), &indexes))
            .with_handler(ProcessSuspendedHandler::new(store.clone(), &indexes))
            .with_handler(ProcessResumedHandler::new(store.clone(), &indexes))
            .with_handler(ProcessCompletedHandler::new(store.clone(), &indexes))
            .with_handler(TaskCreatedHandler::new(store.clone(), &indexes))
            .with_handler(TaskAssignedHandler::new(store.clone(), &indexes))
            .with_handler(TaskStatusHandler::suspended(store.clone(), &indexes))
            .with_handler(TaskStatusHandler::completed(store.clone(), &indexes))
            .with_handler(TaskStatusHandler::cancelled(store, &indexes))
            .with_handler(VariableCreatedHandler::new(updater.clone()))
            .with_handler(VariableUpdatedHandler::new(updater.clone()))
            .with_handler(VariableDeletedHandler::new(updater))
    }

    /// Register `handler` under its event type, replacing any previous one.
    pub fn register<H>(&mut self, handler: H)
    where
        H: QueryEventHandler + 'static,
    {
        let key = handler.handled_event();
        if self.handlers.insert(key, Box::new(handler)).is_some() {
            warn!(event_type = key, "replacing previously registered handler");
        }
    }

    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: QueryEventHandler + 'static,
    {
        self.register(handler);
        self
    }

    /// Registered event types, sorted.
    pub fn handled_events(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.handlers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn dispatch(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<DispatchOutcome> {
        let event_type = event.payload().event_type();
        let Some(handler) = self.handlers.get(event_type) else {
            debug!(event_type, event_id = %event.event_id(), "no handler registered, ignoring event");
            return Ok(DispatchOutcome::NoHandler);
        };

        handler.handle(event)?;
        Ok(DispatchOutcome::Handled)
    }

    /// Apply a batch in order. A failure is logged and does not stop the batch.
    pub fn dispatch_all<'a, I>(&self, events: I) -> Vec<DispatchFailure>
    where
        I: IntoIterator<Item = &'a EventEnvelope<RuntimeEvent>>,
    {
        let mut failures = Vec::new();
        for event in events {
            if let Err(error) = self.dispatch(event) {
                let event_type = event.payload().event_type();
                warn!(
                    event_type,
                    event_id = %event.event_id(),
                    entity_id = event.payload().entity_id(),
                    error = %error,
                    "failed to handle event"
                );
                failures.push(DispatchFailure {
                    event_id: event.event_id(),
                    event_type,
                    error,
                });
            }
        }
        failures
    }
}

impl core::fmt::Debug for QueryEventDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueryEventDispatcher")
            .field("handlers", &self.handled_events())
            .finish()
    }
}
