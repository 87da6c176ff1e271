use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bookstore_kernel::{InitCtx, Module};
use bookstore_kernel::settings::DatabaseSettings;

use crate::memory::MemoryDataSource;

/// Core module owning the datasource lifecycle: load on init, flush on stop
pub struct DbModule {
    datasource: Arc<MemoryDataSource>,
}

impl DbModule {
    pub fn new(datasource: Arc<MemoryDataSource>) -> Self {
        Self { datasource }
    }

    /// Build the datasource described by `settings`
    pub fn datasource_from(settings: &DatabaseSettings) -> Arc<MemoryDataSource> {
        let datasource = MemoryDataSource::new(settings.name.clone());
        let datasource = match &settings.file {
            Some(file) => datasource.with_file(file),
            None => datasource,
        };
        Arc::new(datasource)
    }

    pub fn datasource(&self) -> &Arc<MemoryDataSource> {
        &self.datasource
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.datasource
            .load()
            .await
            .with_context(|| format!("failed to load datasource '{}'", self.datasource.name()))?;

        tracing::info!(
            module = self.name(),
            datasource = self.datasource.name(),
            file = ?self.datasource.file(),
            "datasource ready"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.datasource
            .flush()
            .await
            .with_context(|| format!("failed to flush datasource '{}'", self.datasource.name()))?;

        tracing::info!(module = self.name(), "datasource flushed");
        Ok(())
    }
}
