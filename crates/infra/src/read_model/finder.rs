use flowquery_core::{QueryError, QueryResult};

use super::repository::Repository;

/// Fetch-by-id that turns absence into a [`QueryError::NotFound`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentFinder;

impl DocumentFinder {
    pub fn new() -> Self {
        Self
    }

    /// Look `id` up in `repository`.
    ///
    /// Fails with `not_found_message` verbatim when there is no such document.
    pub fn find_by_id<T, R>(
        &self,
        repository: &R,
        id: &str,
        not_found_message: impl Into<String>,
    ) -> QueryResult<T>
    where
        R: Repository<T> + ?Sized,
    {
        repository
            .find_by_id(id)
            .map_err(|e| QueryError::persistence(format!("Unable to read document with the given id: {id}"), e))?
            .ok_or_else(|| QueryError::not_found(not_found_message))
    }
}
