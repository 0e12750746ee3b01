//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and the validation pipeline's metrics, and an async HTTP
//! exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Metrics recorded by the validation pipeline.
///
/// Every field is a cheap, clonable handle onto the registered collector,
/// so the pipeline thread can own a copy while the exporter reads the
/// registry.
#[derive(Clone)]
pub struct PipelineMetrics {
    /// Transactions taken off the work queue (well-formed ones only).
    pub transactions_dequeued: IntCounter,
    /// Blocks appended to the chain.
    pub blocks_appended: IntCounter,
    /// Rejected transactions, labelled by `reason`.
    pub transactions_rejected: IntCounterVec,
    /// Verification calls that never got an answer, labelled by `check`.
    pub verification_unreachable: IntCounterVec,
    /// Dequeue attempts that failed because the queue was unreachable.
    pub queue_unavailable: IntCounter,
    /// Queue payloads discarded as malformed.
    pub malformed_messages: IntCounter,
    /// Block notifications that could not be published.
    pub notify_failures: IntCounter,
    /// Current chain length.
    pub chain_length: IntGauge,
    /// Time from dequeue to verdict for a single transaction, in seconds.
    pub transaction_processing_seconds: Histogram,
}

impl PipelineMetrics {
    /// Registers pipeline metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let transactions_dequeued = IntCounter::with_opts(Opts::new(
            "pipeline_transactions_dequeued_total",
            "Total number of transactions taken off the work queue",
        ))?;
        registry.register(Box::new(transactions_dequeued.clone()))?;

        let blocks_appended = IntCounter::with_opts(Opts::new(
            "pipeline_blocks_appended_total",
            "Total number of blocks appended to the chain",
        ))?;
        registry.register(Box::new(blocks_appended.clone()))?;

        let transactions_rejected = IntCounterVec::new(
            Opts::new(
                "pipeline_transactions_rejected_total",
                "Total number of rejected transactions by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let verification_unreachable = IntCounterVec::new(
            Opts::new(
                "pipeline_verification_unreachable_total",
                "Verification calls that failed at the transport level, by check",
            ),
            &["check"],
        )?;
        registry.register(Box::new(verification_unreachable.clone()))?;

        let queue_unavailable = IntCounter::with_opts(Opts::new(
            "pipeline_queue_unavailable_total",
            "Total number of dequeue attempts that found the queue unreachable",
        ))?;
        registry.register(Box::new(queue_unavailable.clone()))?;

        let malformed_messages = IntCounter::with_opts(Opts::new(
            "pipeline_malformed_messages_total",
            "Total number of queue payloads discarded as malformed",
        ))?;
        registry.register(Box::new(malformed_messages.clone()))?;

        let notify_failures = IntCounter::with_opts(Opts::new(
            "pipeline_notify_failures_total",
            "Total number of block notifications that failed to publish",
        ))?;
        registry.register(Box::new(notify_failures.clone()))?;

        let chain_length = IntGauge::with_opts(Opts::new(
            "chain_length",
            "Number of blocks in the chain",
        ))?;
        registry.register(Box::new(chain_length.clone()))?;

        let transaction_processing_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pipeline_transaction_processing_seconds",
                "Time to verify and settle a single transaction in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(transaction_processing_seconds.clone()))?;

        Ok(Self {
            transactions_dequeued,
            blocks_appended,
            transactions_rejected,
            verification_unreachable,
            queue_unavailable,
            malformed_messages,
            notify_failures,
            chain_length,
            transaction_processing_seconds,
        })
    }
}

/// Wrapper around a Prometheus registry and the pipeline metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub pipeline: PipelineMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the pipeline metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("popv".to_string()), None)?;
        let pipeline = PipelineMetrics::register(&registry)?;
        Ok(Self { registry, pipeline })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus exporter listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                warn!(error = %err, "prometheus HTTP connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let mut response = Response::new(Full::new(Bytes::from(metrics.gather_text())));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        _ => {
            let mut response = Response::new(Full::new(Bytes::from("not found")));
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn pipeline_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = PipelineMetrics::register(&registry).expect("register metrics");

        metrics.transactions_dequeued.inc();
        metrics.blocks_appended.inc();
        metrics
            .transactions_rejected
            .with_label_values(&["consensus_rejected"])
            .inc();
        metrics
            .verification_unreachable
            .with_label_values(&["signature"])
            .inc();
        metrics.chain_length.set(1);
        metrics.transaction_processing_seconds.observe(0.02);

        assert_eq!(
            metrics
                .transactions_rejected
                .with_label_values(&["consensus_rejected"])
                .get(),
            1
        );
        assert!(!registry.gather().is_empty());
    }

    #[test]
    fn registering_twice_fails() {
        let registry = Registry::new();
        PipelineMetrics::register(&registry).expect("first registration");
        assert!(PipelineMetrics::register(&registry).is_err());
    }

    #[test]
    fn metrics_registry_gather_text_uses_namespace() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.pipeline.blocks_appended.inc();
        registry.pipeline.chain_length.set(3);

        let text = registry.gather_text();
        assert!(text.contains("popv_pipeline_blocks_appended_total 1"));
        assert!(text.contains("popv_chain_length 3"));
    }
}
