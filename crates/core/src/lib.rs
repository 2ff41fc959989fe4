//! `flowquery-core`: shared building blocks of the query-side projector.
//!
//! This crate contains the error model and the document abstraction; it has no
//! storage or transport concerns.

pub mod document;
pub mod error;

pub use document::Document;
pub use error::{BoxError, QueryError, QueryResult};
