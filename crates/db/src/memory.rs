//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::store::{new_id, Commit, DocumentStore, Write};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    version: u64,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    sequence: u64,
    collections: HashMap<String, BTreeMap<String, StoredDocument>>,
}

impl State {
    fn next_version(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn lookup(&self, collection: &str, id: &str) -> Option<&StoredDocument> {
        self.collections.get(collection).and_then(|docs| docs.get(id))
    }
}

/// Document store kept in memory, optionally persisted as a JSON snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current contents with a snapshot file.
    ///
    /// A missing file is not an error; returns the number of documents loaded.
    pub async fn load_snapshot(&self, path: &Path) -> anyhow::Result<usize> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no snapshot found, starting empty");
                return Ok(0);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read snapshot {}", path.display()))
            }
        };

        let loaded: State = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
        let count = loaded.collections.values().map(BTreeMap::len).sum();

        *self.state.write().await = loaded;
        tracing::info!(path = %path.display(), documents = count, "snapshot loaded");
        Ok(count)
    }

    /// Write the current contents to `path` (via a temporary file and rename).
    pub async fn save_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        let raw = {
            let state = self.state.read().await;
            serde_json::to_vec(&*state).context("failed to serialize snapshot")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;

        tracing::info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

fn to_document(collection: &str, id: &str, stored: &StoredDocument) -> Document {
    Document {
        collection: collection.to_string(),
        id: id.to_string(),
        version: stored.version,
        data: stored.data.clone(),
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    }
}

fn require_object(data: &Value) -> StoreResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::NotAnObject)
    }
}

fn merge(target: &mut Value, patch: &Value) -> StoreResult<()> {
    let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) else {
        return Err(StoreError::NotAnObject);
    };
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
    Ok(())
}

type Staged = BTreeMap<(String, String), Option<StoredDocument>>;

/// Apply one write against the staged view, falling back to committed state.
fn stage_write(state: &State, staged: &mut Staged, write: &Write, version: u64, now: DateTime<Utc>) -> StoreResult<()> {
    let (collection, id) = match write {
        Write::Set { collection, id, .. }
        | Write::Update { collection, id, .. }
        | Write::Delete { collection, id } => (collection.clone(), id.clone()),
    };

    let key = (collection.clone(), id.clone());
    let current = match staged.get(&key) {
        Some(entry) => entry.clone(),
        None => state.lookup(&collection, &id).cloned(),
    };

    let next = match write {
        Write::Set { data, .. } => {
            require_object(data)?;
            Some(StoredDocument {
                version,
                data: data.clone(),
                created_at: current.as_ref().map_or(now, |doc| doc.created_at),
                updated_at: now,
            })
        }
        Write::Update { patch, .. } => {
            let mut doc = current.ok_or_else(|| StoreError::not_found(&collection, &id))?;
            merge(&mut doc.data, patch)?;
            doc.version = version;
            doc.updated_at = now;
            Some(doc)
        }
        Write::Delete { .. } => None,
    };

    staged.insert(key, next);
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .lookup(collection, id)
            .map(|stored| to_document(collection, id, stored)))
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let state = self.state.read().await;
        let Some(docs) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let candidates = docs
            .iter()
            .map(|(id, stored)| to_document(collection, id, stored));
        Ok(query.apply(candidates))
    }

    async fn insert(&self, collection: &str, data: Value) -> StoreResult<Document> {
        self.set(collection, &new_id(), data).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> StoreResult<Document> {
        require_object(&data)?;
        let mut state = self.state.write().await;
        let version = state.next_version();
        let now = Utc::now();

        let docs = state.collections.entry(collection.to_string()).or_default();
        let created_at = docs.get(id).map_or(now, |doc| doc.created_at);
        let stored = StoredDocument {
            version,
            data,
            created_at,
            updated_at: now,
        };
        let document = to_document(collection, id, &stored);
        docs.insert(id.to_string(), stored);
        Ok(document)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<Document> {
        let mut state = self.state.write().await;
        let version = state.next_version();

        let stored = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        merge(&mut stored.data, &patch)?;
        stored.version = version;
        stored.updated_at = Utc::now();
        Ok(to_document(collection, id, stored))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let removed = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            state.next_version();
        }
        Ok(removed)
    }

    async fn commit(&self, commit: Commit) -> StoreResult<()> {
        let mut state = self.state.write().await;

        for precondition in &commit.preconditions {
            let current = state
                .lookup(&precondition.collection, &precondition.id)
                .map(|doc| doc.version);
            if current != precondition.version {
                tracing::debug!(
                    collection = %precondition.collection,
                    id = %precondition.id,
                    expected = ?precondition.version,
                    actual = ?current,
                    "commit precondition failed"
                );
                return Err(StoreError::conflict(&precondition.collection, &precondition.id));
            }
        }

        if commit.writes.is_empty() {
            return Ok(());
        }

        let version = state.next_version();
        let now = Utc::now();
        let mut staged = Staged::new();
        for write in &commit.writes {
            stage_write(&state, &mut staged, write, version, now)?;
        }

        for ((collection, id), doc) in staged {
            let docs = state.collections.entry(collection).or_default();
            match doc {
                Some(doc) => {
                    docs.insert(id, doc);
                }
                None => {
                    docs.remove(&id);
                }
            }
        }
        Ok(())
    }
}
