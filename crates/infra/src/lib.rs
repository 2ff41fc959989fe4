//! Infrastructure layer: document store, event handlers, dispatch and workers.
//!
//! Everything that turns runtime events into read-model documents lives here.
//! The pieces compose as:
//!
//! ```text
//! EventBus → ProjectionWorker → QueryEventDispatcher → handlers → DocumentStore
//!                                                        ↘ VariableUpdater ↗
//! ```

pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod read_model;
pub mod variable_updater;
pub mod workers;


pub use config::IndexesConfig;
pub use dispatcher::{DispatchFailure, DispatchOutcome, QueryEventDispatcher};
pub use handlers::QueryEventHandler;
pub use variable_updater::VariableUpdater;
