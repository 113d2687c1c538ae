//! Wires settings into concrete collaborators and drives the module lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alicia_db::MemoryStore;
use alicia_genai::{GeminiClient, GeminiConfig, GenerativeModel};
use alicia_kernel::settings::GenAiSettings;
use alicia_kernel::{AppContext, InitCtx, ModuleRegistry, Settings};
use alicia_storage::LocalBlobStore;
use anyhow::Context;

use crate::modules::{self, system};

/// Everything needed to serve: the shared context and the registered modules.
pub struct Application {
    pub app: AppContext,
    pub registry: ModuleRegistry,
}

/// Build the application without touching the network or the filesystem.
pub fn build(settings: Settings) -> anyhow::Result<Application> {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(LocalBlobStore::new(
        &settings.storage.root,
        settings.storage.public_base_url.clone(),
        settings.storage.max_upload_bytes,
    ));
    let ai = generative_model(&settings.genai)?;
    let snapshot = settings.database.snapshot_path.as_ref().map(PathBuf::from);

    let app = AppContext::new(settings, store.clone(), blobs.clone(), ai);

    let mut registry = ModuleRegistry::new();
    registry.register_core(Arc::new(system::DatabaseModule::new(store, snapshot)));
    registry.register_core(Arc::new(system::StorageModule::new(blobs)));
    modules::register_all(&mut registry);

    Ok(Application { app, registry })
}

fn generative_model(settings: &GenAiSettings) -> anyhow::Result<Option<Arc<dyn GenerativeModel>>> {
    let Some(api_key) = settings
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
    else {
        return Ok(None);
    };

    let client = GeminiClient::new(GeminiConfig {
        api_key,
        base_url: settings.base_url.clone(),
        text_model: settings.text_model.clone(),
        image_model: settings.image_model.clone(),
        speech_model: settings.speech_model.clone(),
        timeout: Duration::from_secs(settings.timeout_secs),
    })
    .context("failed to build the generative model client")?;
    tracing::info!(text_model = %settings.text_model, "generative AI enabled");

    let model: Arc<dyn GenerativeModel> = Arc::new(client);
    Ok(Some(model))
}

/// Init and start every module, serve until shutdown, then stop in reverse.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let Application { app, registry } = build(settings)?;
    let ctx = InitCtx {
        settings: &app.settings,
        app: &app,
    };

    registry.init_core_modules(&ctx).await?;
    registry.init_custom_modules(&ctx).await?;
    registry.start_core_modules(&ctx).await?;
    registry.start_custom_modules(&ctx).await?;

    tracing::info!(
        env = ?app.settings.environment,
        core = registry.core_module_count(),
        custom = registry.custom_module_count(),
        "alicia-app ready"
    );

    // stop modules even when serving failed, so the snapshot is written
    let served = alicia_http::start_server(&registry, &app).await;

    registry.stop_custom_modules().await?;
    registry.stop_core_modules().await?;
    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_credentials_disables_ai() {
        let app = build(Settings::default()).unwrap();
        assert!(app.app.ai.is_none());
        assert_eq!(app.registry.core_module_count(), 2);
        assert!(app.registry.get_module("database").is_some());
        assert!(app.registry.get_module("loyalty").is_some());
    }

    #[test]
    fn test_build_with_key_enables_ai() {
        let mut settings = Settings::default();
        settings.genai.api_key = Some("test-key".into());
        let app = build(settings).unwrap();
        assert!(app.app.ai.is_some());
    }
}
