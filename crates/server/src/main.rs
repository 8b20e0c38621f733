//! Predictor server
//!
//! Assembles the predictor registry at startup and serves predictions,
//! scoring and health probes over HTTP.

use anyhow::{Context, Result};
use predictor_lib::{
    process_start, HealthAggregator, PredictorManifest, ServiceMetrics, StructuredLogger,
};
use predictor_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let started_at = process_start();

    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting predictor-server");

    let config = ServerConfig::load()?;
    info!(addr = %config.listen_addr(), manifest = ?config.manifest, "Server configured");

    let manifest = match &config.manifest {
        Some(path) => PredictorManifest::from_path(path)
            .with_context(|| format!("Failed to load manifest {}", path.display()))?,
        None => {
            info!("No manifest configured, serving built-in predictors");
            PredictorManifest::builtin()
        }
    };

    // Every predictor must pass its self-test before the server starts
    let registry = Arc::new(
        manifest
            .build_registry()
            .context("Failed to assemble predictors")?,
    );

    let logger = StructuredLogger::new(&config.service_name);
    for predictor in registry.iter() {
        logger.log_predictor_registered(
            predictor.name(),
            predictor.version(),
            &predictor.created().to_rfc3339(),
        );
    }

    let metrics = ServiceMetrics::new();
    metrics.set_predictors_registered(registry.len() as i64);

    let health = HealthAggregator::with_start(registry.clone(), started_at);
    let app_state = Arc::new(api::AppState::new(
        health.clone(),
        metrics,
        logger.clone(),
    ));

    health.mark_started();
    logger.log_startup(SERVICE_VERSION, registry.len());

    let shutdown_logger = logger.clone();
    api::serve(&config.listen_addr(), app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shut down");
    Ok(())
}
