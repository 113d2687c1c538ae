use async_trait::async_trait;
use axum::Router;

use crate::context::AppContext;
use crate::settings::Settings;

/// What a module sees while the application boots.
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
    pub app: &'a AppContext,
}

/// A unit of the marketplace: lifecycle hooks, HTTP routes and API docs.
///
/// Core modules (store, storage) run first in a fixed order; feature modules
/// follow in registration order and are mounted under `/api/{name}`.
#[async_trait]
pub trait Module: Sync + Send {
    fn name(&self) -> &'static str;

    /// Runs once before any module starts.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn routes(&self, _app: &AppContext) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components.schemas`) merged into the
    /// served document.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called on shutdown, in reverse start order.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
