use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::document::Document;
use crate::error::StoreResult;
use crate::query::Query;

/// A buffered mutation applied at commit time.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or overwrite the whole document body.
    Set {
        collection: String,
        id: String,
        data: Value,
    },
    /// Shallow-merge top-level fields into an existing document.
    Update {
        collection: String,
        id: String,
        patch: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Version observed by a transactional read. `None` means "did not exist".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub collection: String,
    pub id: String,
    pub version: Option<u64>,
}

/// An atomic batch: every precondition must still hold for any write to land.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Commit {
    pub preconditions: Vec<Precondition>,
    pub writes: Vec<Write>,
}

/// Contract of the hosted document database the application talks to.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Insert a new document under a generated id.
    async fn insert(&self, collection: &str, data: Value) -> StoreResult<Document>;

    /// Create or overwrite a document under a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, data: Value) -> StoreResult<Document>;

    /// Merge top-level fields into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<Document>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Apply a transactional batch atomically or fail with a conflict.
    async fn commit(&self, commit: Commit) -> StoreResult<()>;
}

/// Generate a time-ordered document id.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
