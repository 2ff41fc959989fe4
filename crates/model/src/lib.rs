//! Read-model documents of the query service.
//!
//! This crate holds the process-instance and task documents together with the
//! variable buckets embedded in them. Everything here is deterministic data
//! manipulation (no IO, no storage).

pub mod buckets;
pub mod process_instance;
pub mod service;
pub mod task;
pub mod variable;

pub use buckets::{BucketError, VariableBucket, VariableBuckets};
pub use process_instance::{ProcessInstance, ProcessInstanceStatus};
pub use service::ServiceInfo;
pub use task::{Task, TaskStatus};
pub use variable::{Variable, VariableParent, VariableScope};
