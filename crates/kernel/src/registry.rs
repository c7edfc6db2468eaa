use anyhow::Context;
use std::sync::Arc;

use bookshelf_db::{DocumentStore, UniqueIndex};

use crate::module::{InitCtx, Module};

/// Module registry for managing module lifecycle in registration order
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules in registration order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules.iter()
    }

    /// Get the number of registered modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Create every unique index declared by the registered modules
    pub async fn ensure_indexes(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for (module, index) in self.collect_indexes() {
            tracing::info!(
                module = %module,
                collection = index.collection,
                field = index.field,
                "ensuring unique index"
            );

            ctx.store
                .create_unique_index(&index)
                .await
                .with_context(|| {
                    format!(
                        "failed to create index {}.{} for module '{}'",
                        index.collection, index.field, module
                    )
                })?;
        }

        Ok(())
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start modules in registration order
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect all unique indexes from all modules, tagged with the owning module
    pub fn collect_indexes(&self) -> Vec<(String, UniqueIndex)> {
        let mut indexes = Vec::new();

        for module in &self.modules {
            for index in module.indexes() {
                indexes.push((module.name().to_string(), index));
            }
        }

        // Deduplicate so two modules sharing a collection do not clash
        indexes.sort_by(|a, b| {
            (a.1.collection, a.1.field)
                .cmp(&(b.1.collection, b.1.field))
                .then_with(|| a.0.cmp(&b.0))
        });
        indexes.dedup_by(|a, b| a.1 == b.1);

        indexes
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
