//! Bookshelf application library
//!
//! Wires the application modules to the kernel, the document store and the
//! HTTP layer.

use std::sync::Arc;

use anyhow::Context;
use bookshelf_db::{MemoryStore, SharedStore};
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

/// Re-export commonly used types
pub use modules::*;

/// Registry holding every application module
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    registry
}

/// Create store indexes, then initialize and start every module
pub async fn prepare(registry: &ModuleRegistry, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
    registry
        .ensure_indexes(ctx)
        .await
        .context("failed to create store indexes")?;
    registry.init_modules(ctx).await?;
    registry.start_modules(ctx).await?;
    Ok(())
}

/// Run the service until Ctrl-C, then stop the modules
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(env = ?settings.environment, "bookshelf bootstrap starting");

    let store: SharedStore = Arc::new(MemoryStore::new());
    let registry = registry();
    let ctx = InitCtx {
        settings: &settings,
        store,
    };

    prepare(&registry, &ctx).await?;
    tracing::info!(
        modules = registry.module_count(),
        "bookshelf bootstrap complete"
    );

    let served = bookshelf_http::start_server(&registry, &ctx, shutdown_signal()).await;

    registry
        .stop_modules()
        .await
        .context("failed to stop modules")?;
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            // Keep serving; the process can still be killed.
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await
        }
    }
}
