//! Metrics and instrumentation for the validator.
//!
//! This module defines Prometheus-compatible metrics for the validation
//! pipeline and exposes a small HTTP exporter that serves `/metrics` in
//! Prometheus text format.
//!
//! Typical usage in a node:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use popv_chain::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//!
//! // Spawn the HTTP exporter in the background:
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! // Hand a copy of the pipeline metrics to the worker:
//! let pipeline = pipeline.with_metrics(registry.pipeline.clone());
//! ```

pub mod prometheus;

pub use prometheus::{MetricsRegistry, PipelineMetrics, run_prometheus_http_server};
