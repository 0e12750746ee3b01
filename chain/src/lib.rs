//! PoPV chain library crate.
//!
//! This crate provides the building blocks of a single-validator
//! proof-of-validity chain:
//!
//! - domain types: transactions and hash-linked blocks (`types`),
//! - the single-writer chain and its read-only snapshots (`storage`),
//! - verification and consensus rules (`validation`, `consensus`),
//! - the validation pipeline that drives them (`consensus::engine`),
//! - Redis and in-memory work queues plus block notifiers (`queue`),
//! - the HTTP verification client (`verify_client`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries compose these pieces into a validator node.

pub mod config;
pub mod consensus;
pub mod metrics;
pub mod queue;
pub mod storage;
pub mod types;
pub mod validation;
pub mod verify_client;

// Re-export top-level configuration types.
pub use config::{ConfigError, MetricsConfig, QueueConfig, ValidatorConfig, VerifierConfig};

// Re-export the pipeline and its pluggable rules.
pub use consensus::{
    AcceptAll, CombinedPredicate, ConsensusPredicate, IterationOutcome, PipelineConfig,
    PipelineError, PipelineState, RejectReason, ValidationPipeline,
};

// Re-export queue adapters and notifiers.
pub use queue::{
    BlockNotifier, ChannelNotifier, MemoryWorkQueue, NoopNotifier, NotifyError, QueueError,
    RedisBlockNotifier, RedisWorkQueue, WorkQueue,
};

// Re-export chain storage.
pub use storage::{ChainBuilder, ChainIntegrityError, ChainReader, ChainSnapshot};

// Re-export verification interfaces and the HTTP client.
pub use validation::{ParityPredicate, VerificationClient, VerificationResult, VerifyError};
pub use verify_client::HttpVerificationClient;

// Re-export metrics registry and pipeline metrics.
pub use metrics::{MetricsRegistry, PipelineMetrics, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the pipeline a deployed validator runs.
///
/// This composes:
///
/// - [`RedisWorkQueue`] for pending transactions,
/// - [`HttpVerificationClient`] for signature and proof checks,
/// - [`ParityPredicate`] as the consensus rule,
/// - [`RedisBlockNotifier`] for block announcements.
pub type DefaultValidationPipeline =
    ValidationPipeline<RedisWorkQueue, HttpVerificationClient, ParityPredicate, RedisBlockNotifier>;
