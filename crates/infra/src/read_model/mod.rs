//! Read model storage: the document store gateway and typed access on top of it.

pub mod finder;
pub mod repository;
pub mod store;

pub use finder::DocumentFinder;
pub use repository::{DocumentRepository, ProcessInstanceRepository, Repository, TaskRepository};
pub use store::{DocumentStore, InMemoryDocumentStore, StoreError, UpdateRequest};
