use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use flowquery_core::{QueryError, QueryResult};
use flowquery_events::{event_types, EventEnvelope, RuntimeEvent, VariablePayload};
use flowquery_model::{ServiceInfo, Variable};

use super::{unexpected, QueryEventHandler};
use crate::read_model::{DocumentStore, StoreError};
use crate::variable_updater::VariableUpdater;

fn variable_from_payload(payload: &VariablePayload, service: &ServiceInfo, at: DateTime<Utc>) -> Variable {
    let mut variable = Variable::new(payload.name.clone(), payload.variable_type.clone(), payload.value.clone())
        .with_last_updated_time(at);
    variable.process_instance_id = payload.process_instance_id.clone();
    variable.task_id = payload.task_id.clone();
    variable.service = service.clone();
    variable
}

/// Adds a variable to its parent document, creating the type bucket on demand.
///
/// A parent that does not exist yet is not an error at lookup time; the
/// partial update that follows needs the document and fails instead.
pub struct VariableCreatedHandler<S> {
    updater: Arc<VariableUpdater<S>>,
}

impl<S> VariableCreatedHandler<S> {
    pub fn new(updater: Arc<VariableUpdater<S>>) -> Self {
        Self { updater }
    }
}

impl<S: DocumentStore + Clone> QueryEventHandler for VariableCreatedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::VARIABLE_CREATED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::VariableCreated(payload) = event.payload() else {
            return Err(unexpected("VariableCreatedHandler", event.payload()));
        };
        debug!(
            variable = %payload.name,
            process_instance_id = ?payload.process_instance_id,
            task_id = ?payload.task_id,
            "handling variable created"
        );

        let wrap = |e: StoreError| QueryError::persistence(format!("Error handling VariableCreatedEvent[{event:?}]"), e);

        let mut variable = variable_from_payload(payload, event.service(), event.timestamp());
        variable.created_time = Some(event.timestamp());

        let mut variables = self
            .updater
            .find_variables_if_parent_exists(payload)
            .map_err(wrap)?
            .unwrap_or_default();
        variables.upsert(variable);

        self.updater.write_variables(payload, variables).map_err(wrap)
    }
}

pub struct VariableUpdatedHandler<S> {
    updater: Arc<VariableUpdater<S>>,
}

impl<S> VariableUpdatedHandler<S> {
    pub fn new(updater: Arc<VariableUpdater<S>>) -> Self {
        Self { updater }
    }
}

impl<S: DocumentStore + Clone> QueryEventHandler for VariableUpdatedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::VARIABLE_UPDATED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::VariableUpdated(payload) = event.payload() else {
            return Err(unexpected("VariableUpdatedHandler", event.payload()));
        };
        debug!(variable = %payload.name, "handling variable updated");

        self.updater
            .update_variable(&variable_from_payload(payload, event.service(), event.timestamp()))
    }
}

/// Flags the variable as deleted; it stays in its bucket.
pub struct VariableDeletedHandler<S> {
    updater: Arc<VariableUpdater<S>>,
}

impl<S> VariableDeletedHandler<S> {
    pub fn new(updater: Arc<VariableUpdater<S>>) -> Self {
        Self { updater }
    }
}

impl<S: DocumentStore + Clone> QueryEventHandler for VariableDeletedHandler<S> {
    fn handled_event(&self) -> &'static str {
        event_types::VARIABLE_DELETED
    }

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()> {
        let RuntimeEvent::VariableDeleted(payload) = event.payload() else {
            return Err(unexpected("VariableDeletedHandler", event.payload()));
        };
        debug!(variable = %payload.name, "handling variable deleted");

        self.updater.mark_variable_as_deleted(payload)
    }
}
