//! Background workers feeding the read model.

pub mod projection_worker;

pub use projection_worker::{ProjectionWorker, WorkerHandle};
