use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::document::{to_object, Entity};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::store::{Commit, DocumentStore, Precondition, Write};

/// Typed CRUD access to one collection.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            _record: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Entity<T>>> {
        self.store
            .get(self.name, id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    pub async fn require(&self, id: &str) -> StoreResult<Entity<T>> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(self.name, id))
    }

    pub async fn list(&self, query: &Query) -> StoreResult<Vec<Entity<T>>> {
        self.store
            .query(self.name, query)
            .await?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    pub async fn create(&self, record: &T) -> StoreResult<Entity<T>> {
        let data = to_object(record)?;
        self.store.insert(self.name, data).await?.decode()
    }

    /// Create or overwrite under a chosen id.
    pub async fn put(&self, id: &str, record: &T) -> StoreResult<Entity<T>> {
        let data = to_object(record)?;
        self.store.set(self.name, id, data).await?.decode()
    }

    /// Overwrite an existing record; missing ids are an error.
    ///
    /// The write is conditioned on the version read first, so a record deleted
    /// in between is never recreated.
    pub async fn replace(&self, id: &str, record: &T) -> StoreResult<Entity<T>> {
        let data = to_object(record)?;
        let current = self
            .store
            .get(self.name, id)
            .await?
            .ok_or_else(|| StoreError::not_found(self.name, id))?;

        self.store
            .commit(Commit {
                preconditions: vec![Precondition {
                    collection: self.name.to_string(),
                    id: id.to_string(),
                    version: Some(current.version),
                }],
                writes: vec![Write::Set {
                    collection: self.name.to_string(),
                    id: id.to_string(),
                    data,
                }],
            })
            .await?;
        self.require(id).await
    }

    /// Merge the given top-level fields into an existing record.
    pub async fn patch(&self, id: &str, patch: Value) -> StoreResult<Entity<T>> {
        self.store.update(self.name, id, patch).await?.decode()
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        if self.store.delete(self.name, id).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(self.name, id))
        }
    }
}
