//! Core modules wrapping the document store and blob store lifecycles.

use std::path::PathBuf;
use std::sync::Arc;

use alicia_db::MemoryStore;
use alicia_kernel::{InitCtx, Module};
use alicia_storage::LocalBlobStore;
use anyhow::Context;
use async_trait::async_trait;

/// Loads the store snapshot on init and writes it back on stop.
pub struct DatabaseModule {
    store: Arc<MemoryStore>,
    snapshot: Option<PathBuf>,
}

impl DatabaseModule {
    pub fn new(store: Arc<MemoryStore>, snapshot: Option<PathBuf>) -> Self {
        Self { store, snapshot }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot else {
            tracing::info!("no snapshot configured, starting with an empty store");
            return Ok(());
        };
        if !path.exists() {
            tracing::info!(path = %path.display(), "snapshot not found, starting with an empty store");
            return Ok(());
        }

        let documents = self
            .store
            .load_snapshot(path)
            .await
            .with_context(|| format!("failed to load snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), documents, "snapshot loaded");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.snapshot {
            self.store
                .save_snapshot(path)
                .await
                .with_context(|| format!("failed to save snapshot {}", path.display()))?;
            tracing::info!(path = %path.display(), "snapshot saved");
        }
        Ok(())
    }
}

pub struct StorageModule {
    blobs: Arc<LocalBlobStore>,
}

impl StorageModule {
    pub fn new(blobs: Arc<LocalBlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl Module for StorageModule {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.blobs
            .ensure_root()
            .await
            .with_context(|| format!("failed to create media root {}", self.blobs.root().display()))?;
        tracing::info!(root = %self.blobs.root().display(), "media storage ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alicia_db::DocumentStore;
    use alicia_kernel::{AppContext, Settings};
    use serde_json::json;

    fn ctx_app(store: Arc<MemoryStore>, dir: &std::path::Path) -> AppContext {
        AppContext::new(
            Settings::default(),
            store,
            Arc::new(LocalBlobStore::new(dir.join("media"), "http://localhost/media", 1024)),
            None,
        )
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let store = Arc::new(MemoryStore::new());
        let app = ctx_app(store.clone(), dir.path());
        let ctx = InitCtx {
            settings: &app.settings,
            app: &app,
        };
        let module = DatabaseModule::new(store.clone(), Some(path.clone()));
        module.init(&ctx).await.unwrap();
        store.set("books", "b1", json!({"title": "Pedro Páramo"})).await.unwrap();
        module.stop().await.unwrap();

        let restored = Arc::new(MemoryStore::new());
        DatabaseModule::new(restored.clone(), Some(path))
            .init(&ctx)
            .await
            .unwrap();
        let doc = restored.get("books", "b1").await.unwrap().unwrap();
        assert_eq!(doc.data["title"], "Pedro Páramo");
    }

    #[tokio::test]
    async fn test_storage_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(LocalBlobStore::new(dir.path().join("media/nested"), "http://x", 1024));
        let app = ctx_app(Arc::new(MemoryStore::new()), dir.path());
        let ctx = InitCtx {
            settings: &app.settings,
            app: &app,
        };

        StorageModule::new(blobs.clone()).init(&ctx).await.unwrap();
        assert!(blobs.root().is_dir());
    }
}
