use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use flowquery_core::Document;
use flowquery_model::{ProcessInstance, Task};

use super::store::{DocumentStore, StoreError};

/// Typed access to one kind of document.
pub trait Repository<T>: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Store the whole document under its own id.
    fn save(&self, document: &T) -> Result<(), StoreError>;
}

impl<T, R> Repository<T> for Arc<R>
where
    R: Repository<T> + ?Sized,
{
    fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        (**self).find_by_id(id)
    }

    fn save(&self, document: &T) -> Result<(), StoreError> {
        (**self).save(document)
    }
}

/// Repository over one index of a [`DocumentStore`], (de)serializing with serde.
#[derive(Debug, Clone)]
pub struct DocumentRepository<T, S> {
    store: S,
    index: String,
    _document: PhantomData<fn() -> T>,
}

pub type ProcessInstanceRepository<S> = DocumentRepository<ProcessInstance, S>;
pub type TaskRepository<S> = DocumentRepository<Task, S>;

impl<T, S> DocumentRepository<T, S> {
    pub fn new(store: S, index: impl Into<String>) -> Self {
        Self {
            store,
            index: index.into(),
            _document: PhantomData,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

impl<T, S> Repository<T> for DocumentRepository<T, S>
where
    T: Document + Serialize + DeserializeOwned,
    S: DocumentStore,
{
    fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(&self.index, id)? {
            Some(source) => Ok(Some(serde_json::from_value(source)?)),
            None => Ok(None),
        }
    }

    fn save(&self, document: &T) -> Result<(), StoreError> {
        let source = serde_json::to_value(document)?;
        debug!(index = %self.index, kind = T::KIND, id = document.id(), "saving document");
        self.store.index(&self.index, document.id(), source)
    }
}
