//! One handler per runtime event type.
//!
//! Handlers are keyed by the event-type name they return from
//! [`QueryEventHandler::handled_event`]; the dispatcher routes on that key.
//! Each handler narrows the envelope payload to the variant it expects and
//! projects it into the read model through the document store.

pub mod process;
pub mod task;
pub mod variable;

use flowquery_core::{QueryError, QueryResult};
use flowquery_events::{Event, EventEnvelope, RuntimeEvent};

pub use process::{
    ProcessCompletedHandler, ProcessCreatedHandler, ProcessResumedHandler, ProcessStartedHandler,
    ProcessSuspendedHandler,
};
pub use task::{TaskAssignedHandler, TaskCreatedHandler, TaskStatusHandler};
pub use variable::{VariableCreatedHandler, VariableDeletedHandler, VariableUpdatedHandler};

/// Projects one kind of runtime event into the read model.
///
/// Delivery is at-least-once, so implementations must tolerate seeing the
/// same event twice.
pub trait QueryEventHandler: Send + Sync {
    /// Event-type name this handler is registered under.
    fn handled_event(&self) -> &'static str;

    fn handle(&self, event: &EventEnvelope<RuntimeEvent>) -> QueryResult<()>;
}

pub(crate) fn unexpected(handler: &'static str, event: &RuntimeEvent) -> QueryError {
    QueryError::unexpected_event(handler, event.event_type())
}
