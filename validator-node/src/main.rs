// validator-node/src/main.rs

//! Validator node binary.
//!
//! This binary runs the PoPV validation pipeline on top of the
//! `popv-chain` crate and exposes a small read-only HTTP API:
//!
//! - `GET /blockchain_status`
//! - `GET /health`
//!
//! The pipeline consumes the Redis work queue on a dedicated worker thread.
//! The HTTP server reads chain snapshots only. A Prometheus exporter serves
//! `/metrics` on its own port.

mod config;
mod routes;
mod state;
mod worker;

use std::sync::Arc;

use axum::{Router, routing::get};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use config::Cli;
use popv_chain::{ChainBuilder, MetricsRegistry, ValidatorConfig, run_prometheus_http_server};
use routes::{health, status};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "validator_node=info,popv_chain=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let api_cfg = cli.api_config();
    let mut chain_cfg =
        ValidatorConfig::from_env().map_err(|e| format!("invalid configuration: {e}"))?;
    cli.apply(&mut chain_cfg);

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if chain_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = chain_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
    }
    let pipeline_metrics = chain_cfg
        .metrics
        .enabled
        .then(|| metrics.pipeline.clone());

    // ---------------------------
    // Chain + shared state
    // ---------------------------

    let chain = ChainBuilder::new(chain_cfg.validator_id.clone());
    let app_state: SharedState = Arc::new(AppState {
        chain: chain.reader(),
    });

    let app = Router::new()
        .route("/blockchain_status", get(status::blockchain_status))
        .route("/health", get(health::health))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    // ---------------------------
    // Pipeline worker
    // ---------------------------

    let stop = CancellationToken::new();
    tracing::info!(
        validator_id = %chain_cfg.validator_id,
        queue = %chain_cfg.pipeline.queue_name,
        "starting validator"
    );
    let worker = worker::spawn(chain_cfg, chain, pipeline_metrics, stop.clone())
        .map_err(|e| format!("failed to spawn pipeline worker: {e}"))?;

    // ---------------------------
    // axum 0.8 server
    // ---------------------------

    tracing::info!("status API listening on http://{}", api_cfg.listen_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(stop.clone()))
        .await
        .map_err(|e| format!("API server error: {e}"));

    // Let the in-flight transaction settle, but never wait forever.
    stop.cancel();
    match worker.join(api_cfg.shutdown_timeout).await {
        Some(Ok(())) => tracing::info!("pipeline worker stopped"),
        Some(Err(e)) => return Err(format!("validation pipeline failed: {e}")),
        None => tracing::warn!(
            timeout_secs = api_cfg.shutdown_timeout.as_secs(),
            "pipeline worker did not stop in time, exiting anyway"
        ),
    }

    served
}

/// Waits for Ctrl-C or for the worker to stop, used for graceful shutdown.
async fn shutdown_signal(stop: CancellationToken) {
    tokio::select! {
        _ = signal::ctrl_c() => tracing::info!("shutdown signal received"),
        _ = stop.cancelled() => tracing::info!("pipeline worker exited, shutting down"),
    }
}
