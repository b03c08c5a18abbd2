//! Application setup and initialization
//!
//! Everything `main` needs to go from configuration to a ready router.

pub mod routes;
pub mod server;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use rookvault_core::ServiceConfig;
use rookvault_transfer::{ProcessRunner, ProcessRunnerConfig, TransferPipeline, Workspace};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: ServiceConfig) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    let warnings =
        validation::validate_config(&config).context("Configuration validation failed")?;

    rookvault_infra::init_telemetry("rookvault-api", config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    for warning in warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir.display(),
        rbd_path = %config.rbd_path,
        object_store_cli = %config.object_store_cli,
        "Configuration loaded and validated successfully"
    );

    let runner = ProcessRunner::new(ProcessRunnerConfig::from(&config));
    let pipeline = TransferPipeline::new(Arc::new(runner), Workspace::new(&config.work_dir));

    bootstrap_cluster(&config, &pipeline).await;

    let state = Arc::new(AppState::new(config.clone(), pipeline));
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}

/// Run the toolbox bootstrap once. A failure is logged and does not stop the service: the
/// cluster session may already be set up by the container.
pub async fn bootstrap_cluster(config: &ServiceConfig, pipeline: &TransferPipeline) {
    let Some(toolbox) = config.toolbox_path.as_deref() else {
        tracing::debug!("TOOLBOX_PATH not set, skipping cluster bootstrap");
        return;
    };

    match pipeline.bootstrap().await {
        Ok(()) => tracing::info!(toolbox, "Cluster bootstrap completed"),
        Err(e) => tracing::error!(toolbox, error = %e.detailed_message(), "Cluster bootstrap failed"),
    }
}
