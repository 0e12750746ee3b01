//! Validation pipeline and consensus rules.
//!
//! This module provides the validator's processing core:
//!
//! - configuration parameters ([`config::PipelineConfig`]),
//! - pluggable acceptance rules ([`validator::ConsensusPredicate`]),
//! - the pipeline's states and per-iteration outcomes ([`state`]),
//! - the single-consumer loop itself ([`engine::ValidationPipeline`]).

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod validator;

pub use config::PipelineConfig;
pub use engine::ValidationPipeline;
pub use error::PipelineError;
pub use state::{IterationOutcome, PipelineState, RejectReason};
pub use validator::{AcceptAll, CombinedPredicate, ConsensusPredicate};
