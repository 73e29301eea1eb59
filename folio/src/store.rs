//! Document store contract.
//!
//! The keyed document store is the system of record for indexed documents.
//! Folio only needs inserts, lookups by id, `distinct` over a field path and a
//! filtered `find`; any backend that can evaluate a [`StoreFilter`] fits.

use crate::filters::StoreFilter;
use crate::interface::Document;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached. Never retried by this crate.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The backend refused the request (e.g. a malformed filter value).
    #[error("store rejected request: {0}")]
    Rejected(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its identifier. An empty `document.id`
    /// asks the store to mint one.
    fn insert(&self, document: Document) -> StoreResult<String>;

    fn get(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Returns whether a document was removed.
    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Unique string values found at a dotted field path, e.g. `tags.course`.
    fn distinct(&self, field: &str) -> StoreResult<Vec<String>>;

    /// Documents matching every entry of `filter`.
    fn find(&self, filter: &StoreFilter) -> StoreResult<Vec<Document>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    fn insert(&self, document: Document) -> StoreResult<String> {
        (**self).insert(document)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        (**self).get(id)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        (**self).delete(id)
    }

    fn distinct(&self, field: &str) -> StoreResult<Vec<String>> {
        (**self).distinct(field)
    }

    fn find(&self, filter: &StoreFilter) -> StoreResult<Vec<Document>> {
        (**self).find(filter)
    }
}
