//! Runtime events consumed by the query side, and the bus they travel on.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod runtime;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use runtime::{
    event_types, ProcessInstancePayload, RuntimeEvent, TaskPayload, VariablePayload,
};
