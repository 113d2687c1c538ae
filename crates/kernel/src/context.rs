use std::sync::Arc;

use alicia_db::{Collection, DocumentStore};
use alicia_genai::GenerativeModel;
use alicia_storage::BlobStore;
use serde::{de::DeserializeOwned, Serialize};

use crate::settings::Settings;

/// Shared handles to the external collaborators, cloned into every router.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// `None` when no model credentials are configured.
    pub ai: Option<Arc<dyn GenerativeModel>>,
}

impl AppContext {
    pub fn new(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        ai: Option<Arc<dyn GenerativeModel>>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            blobs,
            ai,
        }
    }

    /// Typed access to a document collection.
    pub fn collection<T: Serialize + DeserializeOwned>(&self, name: &'static str) -> Collection<T> {
        Collection::new(Arc::clone(&self.store), name)
    }
}
