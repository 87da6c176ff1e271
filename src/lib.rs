//! Bookstore application library
//!
//! Wires the datasource and the project modules into a module registry and
//! runs the HTTP server around them.

pub mod modules;

use std::sync::Arc;

use anyhow::Context;
use bookstore_db::DbModule;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::*;

/// Build the registry: the datasource as a core module, then every custom module
pub fn build_registry(settings: &Settings) -> ModuleRegistry {
    let datasource = DbModule::datasource_from(&settings.database);

    let mut registry = ModuleRegistry::new();
    registry.register_core(Arc::new(DbModule::new(datasource.clone())));
    modules::register_all(&mut registry, datasource);
    registry
}

/// Boot every module, serve HTTP until Ctrl-C, then shut the modules down
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry(&settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .init_all(&ctx)
        .await
        .context("failed to initialize modules")?;
    registry
        .start_all(&ctx)
        .await
        .context("failed to start modules")?;

    tracing::info!(
        core = registry.core_module_count(),
        custom = registry.custom_module_count(),
        "bookstore bootstrap complete"
    );

    let served = bookstore_http::start_server(&registry, &settings, shutdown_signal()).await;

    // Stop modules even if the server failed, then report the server error first
    let stopped = registry.stop_all().await.context("failed to stop modules");
    served.and(stopped)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
