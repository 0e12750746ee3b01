//! Validator node configuration.
//!
//! The chain-level settings come from `ValidatorConfig::from_env()`; the
//! flags below (each also settable through an environment variable)
//! override them and configure the HTTP status server.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use popv_chain::ValidatorConfig;

/// Command-line options for the validator node.
#[derive(Debug, Parser)]
#[command(name = "validator-node", version, about)]
pub struct Cli {
    /// Address the status API binds to.
    #[arg(long, env = "VALIDATOR_LISTEN_ADDR", default_value = "0.0.0.0:5003")]
    pub listen_addr: SocketAddr,

    /// Work queue to consume pending transactions from.
    #[arg(long, env = "VALIDATOR_QUEUE_NAME")]
    pub queue_name: Option<String>,

    /// Channel appended blocks are published on.
    #[arg(long, env = "VALIDATOR_NOTIFY_CHANNEL")]
    pub notify_channel: Option<String>,

    /// Seconds a single dequeue may block.
    #[arg(long, env = "VALIDATOR_DEQUEUE_TIMEOUT_SECS")]
    pub dequeue_timeout_secs: Option<u64>,

    /// Timeout for each signature or proof verification call, in ms.
    #[arg(long, env = "VALIDATOR_VERIFY_TIMEOUT_MS")]
    pub verify_timeout_ms: Option<u64>,

    /// Backoff after the queue is found unreachable, in ms.
    #[arg(long, env = "VALIDATOR_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// Give up after this many consecutive queue failures (default: never).
    #[arg(long, env = "VALIDATOR_MAX_QUEUE_FAILURES")]
    pub max_queue_failures: Option<u32>,

    /// Pause between loop iterations, in ms.
    #[arg(long, env = "VALIDATOR_ITERATION_PAUSE_MS")]
    pub iteration_pause_ms: Option<u64>,

    /// How long shutdown waits for the pipeline worker to finish.
    #[arg(long, env = "VALIDATOR_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Address of the Prometheus exporter.
    #[arg(long, env = "VALIDATOR_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Disable the Prometheus exporter.
    #[arg(long, env = "VALIDATOR_NO_METRICS")]
    pub no_metrics: bool,
}

/// Configuration for the status HTTP server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Upper bound on waiting for the worker during shutdown.
    pub shutdown_timeout: Duration,
}

impl Cli {
    /// Layers the command-line overrides onto `cfg`.
    pub fn apply(&self, cfg: &mut ValidatorConfig) {
        let pipeline = &mut cfg.pipeline;
        if let Some(name) = &self.queue_name {
            pipeline.queue_name = name.clone();
        }
        if let Some(channel) = &self.notify_channel {
            pipeline.notify_channel = channel.clone();
        }
        if let Some(secs) = self.dequeue_timeout_secs {
            pipeline.dequeue_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.retry_delay_ms {
            pipeline.retry_delay = Duration::from_millis(ms);
        }
        if self.max_queue_failures.is_some() {
            pipeline.max_consecutive_queue_failures = self.max_queue_failures;
        }
        if let Some(ms) = self.iteration_pause_ms {
            pipeline.iteration_pause = Duration::from_millis(ms);
        }

        if let Some(ms) = self.verify_timeout_ms {
            cfg.verifier.timeout = Duration::from_millis(ms);
        }

        if let Some(addr) = self.metrics_addr {
            cfg.metrics.listen_addr = addr;
        }
        if self.no_metrics {
            cfg.metrics.enabled = false;
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            listen_addr: self.listen_addr,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_chain_config_untouched() {
        let cli = Cli::try_parse_from(["validator-node"]).unwrap();
        let mut cfg = ValidatorConfig::default();
        cli.apply(&mut cfg);

        assert_eq!(cli.listen_addr.port(), 5003);
        assert_eq!(cli.api_config().shutdown_timeout, Duration::from_secs(10));
        assert_eq!(cfg.pipeline.queue_name, "pending_transactions");
        assert_eq!(cfg.pipeline.dequeue_timeout, Duration::from_secs(5));
        assert!(cfg.metrics.enabled);
    }

    #[test]
    fn flags_override_chain_config() {
        let cli = Cli::try_parse_from([
            "validator-node",
            "--listen-addr",
            "127.0.0.1:6000",
            "--queue-name",
            "txs",
            "--dequeue-timeout-secs",
            "2",
            "--verify-timeout-ms",
            "750",
            "--retry-delay-ms",
            "250",
            "--max-queue-failures",
            "5",
            "--iteration-pause-ms",
            "0",
            "--no-metrics",
        ])
        .unwrap();
        let mut cfg = ValidatorConfig::default();
        cli.apply(&mut cfg);

        assert_eq!(cli.api_config().listen_addr.port(), 6000);
        assert_eq!(cfg.pipeline.queue_name, "txs");
        assert_eq!(cfg.pipeline.dequeue_timeout, Duration::from_secs(2));
        assert_eq!(cfg.verifier.timeout, Duration::from_millis(750));
        assert_eq!(cfg.pipeline.retry_delay, Duration::from_millis(250));
        assert_eq!(cfg.pipeline.max_consecutive_queue_failures, Some(5));
        assert_eq!(cfg.pipeline.iteration_pause, Duration::ZERO);
        assert!(!cfg.metrics.enabled);
    }

    #[test]
    fn bad_listen_address_is_rejected() {
        assert!(Cli::try_parse_from(["validator-node", "--listen-addr", "nowhere"]).is_err());
    }
}
