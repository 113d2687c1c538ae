//! Optimistic read-modify-write transactions.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::document::{to_object, Document, Entity};
use crate::error::{StoreError, StoreResult};
use crate::store::{new_id, Commit, DocumentStore, Precondition, Write};

/// Reads record the version they observed; writes are buffered until commit.
pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    reads: BTreeMap<(String, String), Option<u64>>,
    writes: Vec<Write>,
}

impl Transaction {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            writes: Vec::new(),
        }
    }

    /// Read a document and pin its version for the commit check.
    pub async fn get(&mut self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let doc = self.store.get(collection, id).await?;
        let version = doc.as_ref().map(|d| d.version);

        match self.reads.entry((collection.to_string(), id.to_string())) {
            Entry::Vacant(slot) => {
                slot.insert(version);
            }
            Entry::Occupied(seen) if *seen.get() != version => {
                return Err(StoreError::conflict(collection, id));
            }
            Entry::Occupied(_) => {}
        }
        Ok(doc)
    }

    pub async fn get_entity<T: DeserializeOwned>(
        &mut self,
        collection: &str,
        id: &str,
    ) -> StoreResult<Option<Entity<T>>> {
        self.get(collection, id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Like [`Transaction::get_entity`] but a missing document is an error.
    pub async fn require<T: DeserializeOwned>(
        &mut self,
        collection: &str,
        id: &str,
    ) -> StoreResult<Entity<T>> {
        self.get_entity(collection, id)
            .await?
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    pub fn set(&mut self, collection: &str, id: &str, data: Value) {
        self.writes.push(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        });
    }

    pub fn set_record<T: Serialize>(&mut self, collection: &str, id: &str, record: &T) -> StoreResult<()> {
        let data = to_object(record)?;
        self.set(collection, id, data);
        Ok(())
    }

    /// Buffer a new record under a generated id and return that id.
    pub fn insert_record<T: Serialize>(&mut self, collection: &str, record: &T) -> StoreResult<String> {
        let id = new_id();
        self.set_record(collection, &id, record)?;
        Ok(id)
    }

    pub fn update(&mut self, collection: &str, id: &str, patch: Value) {
        self.writes.push(Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        });
    }

    pub fn delete(&mut self, collection: &str, id: &str) {
        self.writes.push(Write::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }

    pub async fn commit(self) -> StoreResult<()> {
        let preconditions = self
            .reads
            .into_iter()
            .map(|((collection, id), version)| Precondition {
                collection,
                id,
                version,
            })
            .collect();

        self.store
            .commit(Commit {
                preconditions,
                writes: self.writes,
            })
            .await
    }
}

/// Run `body` in a fresh transaction and commit it, retrying on conflict.
///
/// Errors returned by `body` abort the attempt without writing anything.
/// The body must own whatever it needs, since it may run more than once.
pub async fn run_transaction<T, E, F>(
    store: &Arc<dyn DocumentStore>,
    attempts: u32,
    mut body: F,
) -> Result<T, E>
where
    F: for<'t> FnMut(&'t mut Transaction) -> BoxFuture<'t, Result<T, E>>,
    E: From<StoreError>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        let mut tx = Transaction::new(Arc::clone(store));
        let value = body(&mut tx).await?;

        match tx.commit().await {
            Ok(()) => return Ok(value),
            Err(StoreError::Conflict { collection, id }) if attempt < attempts => {
                tracing::debug!(%collection, %id, attempt, "transaction conflict, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_commit_after_read_modify_write() {
        let store = store();
        store.set("users", "u1", json!({"points": 50})).await.unwrap();

        let balance: i64 = run_transaction(&store, 3, |tx| {
            async move {
                let user = tx.get("users", "u1").await?.expect("user exists");
                let points = user.data["points"].as_i64().unwrap_or_default() - 20;
                tx.update("users", "u1", json!({"points": points}));
                Ok::<_, StoreError>(points)
            }
            .boxed()
        })
        .await
        .unwrap();

        assert_eq!(balance, 30);
        let user = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(user.data["points"], 30);
    }

    #[tokio::test]
    async fn test_interleaved_write_causes_conflict() {
        let store = store();
        store.set("items", "i1", json!({"stock": 1})).await.unwrap();

        let mut tx = Transaction::new(Arc::clone(&store));
        tx.get("items", "i1").await.unwrap();
        tx.update("items", "i1", json!({"stock": 0}));

        // a competing writer lands first
        store.update("items", "i1", json!({"stock": 5})).await.unwrap();

        let err = tx.commit().await.unwrap_err();
        assert!(err.is_conflict());
        let item = store.get("items", "i1").await.unwrap().unwrap();
        assert_eq!(item.data["stock"], 5);
    }

    #[tokio::test]
    async fn test_absent_read_conflicts_with_creation() {
        let store = store();
        let mut tx = Transaction::new(Arc::clone(&store));
        assert!(tx.get("slugs", "la-buena-vida").await.unwrap().is_none());
        tx.set("slugs", "la-buena-vida", json!({"owner": "a"}));

        store
            .set("slugs", "la-buena-vida", json!({"owner": "b"}))
            .await
            .unwrap();

        assert!(tx.commit().await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_retries_until_attempts_exhausted() {
        let store = store();
        store.set("items", "i1", json!({"stock": 3})).await.unwrap();
        let runs = Arc::new(AtomicU32::new(0));

        let result: Result<(), StoreError> = run_transaction(&store, 2, |tx| {
            let store = Arc::clone(&store);
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tx.get("items", "i1").await?;
                // sabotage every attempt
                store.update("items", "i1", json!({"touched": true})).await?;
                tx.update("items", "i1", json!({"stock": 2}));
                Ok(())
            }
            .boxed()
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_body_error_writes_nothing() {
        let store = store();
        let result: Result<(), StoreError> = run_transaction(&store, 3, |tx| {
            async move {
                tx.set("ledger", "l1", json!({"delta": 1}));
                Err(StoreError::not_found("users", "ghost"))
            }
            .boxed()
        })
        .await;

        assert!(result.is_err());
        assert!(store.get("ledger", "l1").await.unwrap().is_none());
    }
}
