use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization and startup.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Core trait every SHELF module implements.
///
/// Modules own their stores and handlers; the kernel only drives the
/// lifecycle and mounts the returned router under `/api/{name}`.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module. Doubles as the mount segment.
    fn name(&self) -> &'static str;

    /// Called once during application startup, before any routes are served.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The module's router. Mounted under `/api/{module_name}`.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment for this module, merged into the served document
    /// with its paths prefixed by the mount point.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Start background work. Called after every module is initialized.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and release resources. Called during shutdown.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
