//! Top-level configuration for a validator node.
//!
//! This module aggregates configuration for:
//!
//! - the work queue connection (`QueueConfig`),
//! - the signature and proof services (`VerifierConfig`),
//! - the validation loop (`PipelineConfig`),
//! - the metrics exporter (`MetricsConfig`).
//!
//! `ValidatorConfig::from_env()` reads the deployment environment
//! variables; binaries can then layer command-line overrides on top.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::consensus::PipelineConfig;
use crate::types::DEFAULT_VALIDATOR_ID;

pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
pub const ENV_REDIS_PORT: &str = "REDIS_PORT";
pub const ENV_SIGNATURE_URL: &str = "ECDSA_SERVICE_URL";
pub const ENV_PROOF_URL: &str = "SZS_STARK_SERVICE_URL";
pub const ENV_VALIDATOR_ID: &str = "VALIDATOR_ID";

const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection settings for the Redis work queue and notification channel.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Redis connection URL, e.g. `"redis://127.0.0.1:6379/"`.
    pub redis_url: String,
    /// Upper bound on establishing a connection.
    pub connect_timeout: Duration,
}

impl QueueConfig {
    /// Builds the connection URL for `host:port`.
    pub fn redis_url_for(host: &str, port: u16) -> String {
        format!("redis://{host}:{port}/")
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: Self::redis_url_for(DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Configuration for the verification services.
#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Base URL of the signature service, e.g. `"http://127.0.0.1:5001"`.
    pub signature_url: String,
    /// Base URL of the proof service, e.g. `"http://127.0.0.1:5002"`.
    pub proof_url: String,
    /// Request timeout for each verification call.
    pub timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            signature_url: "http://127.0.0.1:5001".to_string(),
            proof_url: "http://127.0.0.1:5002".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9898)),
        }
    }
}

/// Top-level configuration for a validator node.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Identity stamped into every appended block.
    pub validator_id: String,
    pub queue: QueueConfig,
    pub verifier: VerifierConfig,
    pub pipeline: PipelineConfig,
    pub metrics: MetricsConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            validator_id: DEFAULT_VALIDATOR_ID.to_string(),
            queue: QueueConfig::default(),
            verifier: VerifierConfig::default(),
            pipeline: PipelineConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, starting from the defaults.
    ///
    /// Unset and empty variables keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(id) = get(ENV_VALIDATOR_ID) {
            cfg.validator_id = id;
        }

        let host = get(ENV_REDIS_HOST).unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string());
        let port = match get(ENV_REDIS_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: ENV_REDIS_PORT,
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_REDIS_PORT,
        };
        cfg.queue.redis_url = QueueConfig::redis_url_for(&host, port);

        if let Some(url) = get(ENV_SIGNATURE_URL) {
            cfg.verifier.signature_url = check_http_url(ENV_SIGNATURE_URL, url)?;
        }
        if let Some(url) = get(ENV_PROOF_URL) {
            cfg.verifier.proof_url = check_http_url(ENV_PROOF_URL, url)?;
        }

        Ok(cfg)
    }
}

fn check_http_url(key: &'static str, url: String) -> Result<String, ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: url,
            reason: "expected an http:// or https:// URL".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_local_deployment() {
        let cfg = ValidatorConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(cfg.validator_id, "PoPV-Validator-001");
        assert_eq!(cfg.queue.redis_url, "redis://127.0.0.1:6379/");
        assert_eq!(cfg.verifier.signature_url, "http://127.0.0.1:5001");
        assert_eq!(cfg.verifier.proof_url, "http://127.0.0.1:5002");
        assert_eq!(cfg.verifier.timeout, Duration::from_secs(2));
        assert_eq!(cfg.pipeline.queue_name, "pending_transactions");
        assert_eq!(cfg.pipeline.notify_channel, "new_block_channel");
        assert_eq!(cfg.pipeline.dequeue_timeout, Duration::from_secs(5));
        assert_eq!(cfg.pipeline.retry_delay, Duration::from_secs(1));
        assert_eq!(cfg.pipeline.max_consecutive_queue_failures, None);
        assert!(cfg.metrics.enabled);
        assert_eq!(cfg.metrics.listen_addr.port(), 9898);
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = ValidatorConfig::from_lookup(lookup(&[
            ("REDIS_HOST", "redis"),
            ("REDIS_PORT", "6380"),
            ("ECDSA_SERVICE_URL", "http://ecdsa:5001"),
            ("SZS_STARK_SERVICE_URL", "http://szsstark:5002"),
            ("VALIDATOR_ID", "PoPV-Validator-007"),
        ]))
        .unwrap();

        assert_eq!(cfg.validator_id, "PoPV-Validator-007");
        assert_eq!(cfg.queue.redis_url, "redis://redis:6380/");
        assert_eq!(cfg.verifier.signature_url, "http://ecdsa:5001");
        assert_eq!(cfg.verifier.proof_url, "http://szsstark:5002");
    }

    #[test]
    fn empty_values_keep_defaults() {
        let cfg =
            ValidatorConfig::from_lookup(lookup(&[("REDIS_HOST", ""), ("VALIDATOR_ID", "  ")]))
                .unwrap();

        assert_eq!(cfg.queue.redis_url, "redis://127.0.0.1:6379/");
        assert_eq!(cfg.validator_id, "PoPV-Validator-001");
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = ValidatorConfig::from_lookup(lookup(&[("REDIS_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "REDIS_PORT",
                ..
            }
        ));

        let err = ValidatorConfig::from_lookup(lookup(&[("ECDSA_SERVICE_URL", "ecdsa:5001")]))
            .unwrap_err();
        assert!(err.to_string().contains("ECDSA_SERVICE_URL"));
    }
}
