//! HTTP server facade for bookshelf with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{routing::get, Router};

use bookshelf_kernel::{InitCtx, ModuleRegistry};

pub mod error;
pub mod middleware;
pub mod router;

use router::RouterBuilder;

/// Start the HTTP server with the given module registry and serve until
/// `shutdown` resolves
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    ctx: &InitCtx<'_>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let server = &ctx.settings.server;
    tracing::info!("starting HTTP server on {}:{}", server.host, server.port);

    let app = build_router(registry, ctx);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", server.host, server.port))
        .await
        .context("failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}:{}",
        server.host,
        server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted and the
/// middleware chain applied
pub fn build_router(registry: &ModuleRegistry, ctx: &InitCtx<'_>) -> Router {
    let server = &ctx.settings.server;
    let mut router_builder = RouterBuilder::new()
        .with_base_path(&server.base_path)
        .route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under {}/{}",
            server.base_path.trim_end_matches('/'),
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes(ctx));
    }

    // Innermost first: content type is checked after logging and request ids
    router_builder
        .with_openapi(registry)
        .with_not_found_fallback()
        .with_json_content_type()
        .with_timeout(server.request_timeout_ms)
        .with_tracing()
        .with_request_id()
        .with_cors()
        .build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
