use async_trait::async_trait;
use axum::Router;
use bookshelf_db::{SharedStore, UniqueIndex};

/// Context provided to modules during initialization and route building
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub store: SharedStore,
}

/// Core module trait that all bookshelf modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module; also the path segment its routes are mounted under
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup after indexes are in place
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `{base_path}/{module_name}`
    fn routes(&self, _ctx: &InitCtx<'_>) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Unique constraints the store must enforce for this module's collections
    fn indexes(&self) -> Vec<UniqueIndex> {
        vec![]
    }

    /// Start background tasks for this module
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
