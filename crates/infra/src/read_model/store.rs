use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document [{index}/{id}] missing")]
    DocumentMissing { index: String, id: String },

    #[error("document [{index}/{id}] is not a JSON object")]
    InvalidDocument { index: String, id: String },

    #[error("failed to (de)serialize document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document store lock poisoned")]
    Poisoned,
}

/// Partial update of one document: the top-level fields of `doc` replace the
/// same fields of the stored document, everything else is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    index: String,
    doc_type: String,
    id: String,
    doc: JsonValue,
}

impl UpdateRequest {
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            doc: JsonValue::Object(Map::new()),
        }
    }

    pub fn doc(mut self, doc: JsonValue) -> Self {
        self.doc = doc;
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &JsonValue {
        &self.doc
    }
}

/// Gateway to the document store holding the read model.
///
/// Documents are JSON objects addressed by `(index, id)`. No version checks
/// are performed: the last write to a field wins.
pub trait DocumentStore: Send + Sync {
    fn get(&self, index: &str, id: &str) -> Result<Option<JsonValue>, StoreError>;

    /// Store the whole document, replacing any previous one.
    fn index(&self, index: &str, id: &str, document: JsonValue) -> Result<(), StoreError>;

    /// Merge the request's fields into an existing document.
    ///
    /// Fails with [`StoreError::DocumentMissing`] when there is nothing to merge into.
    fn update(&self, request: UpdateRequest) -> Result<(), StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, index: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        (**self).get(index, id)
    }

    fn index(&self, index: &str, id: &str, document: JsonValue) -> Result<(), StoreError> {
        (**self).index(index, id, document)
    }

    fn update(&self, request: UpdateRequest) -> Result<(), StoreError> {
        (**self).update(request)
    }
}

/// In-memory document store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<HashMap<(String, String), JsonValue>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of an index, in no particular order.
    pub fn documents(&self, index: &str) -> Vec<JsonValue> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((i, _id), doc)| if i == index { Some(doc.clone()) } else { None })
            .collect()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, index: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&(index.to_string(), id.to_string())).cloned())
    }

    fn index(&self, index: &str, id: &str, document: JsonValue) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert((index.to_string(), id.to_string()), document);
        Ok(())
    }

    fn update(&self, request: UpdateRequest) -> Result<(), StoreError> {
        let UpdateRequest { index, id, doc, .. } = request;
        let JsonValue::Object(fields) = doc else {
            return Err(StoreError::InvalidDocument { index, id });
        };

        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = (index, id);
        let Some(existing) = map.get_mut(&key) else {
            let (index, id) = key;
            return Err(StoreError::DocumentMissing { index, id });
        };
        let Some(target) = existing.as_object_mut() else {
            let (index, id) = key;
            return Err(StoreError::InvalidDocument { index, id });
        };

        target.extend(fields);
        Ok(())
    }
}
