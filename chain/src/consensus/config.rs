use std::time::Duration;

use crate::queue::{DEFAULT_NOTIFY_CHANNEL, DEFAULT_QUEUE_NAME};

/// Validation pipeline parameters.
///
/// This includes the queue/channel names the pipeline talks to and the
/// timing knobs of its loop (dequeue timeout, reconnect backoff, pause
/// between iterations).
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Work queue holding pending transactions.
    pub queue_name: String,
    /// Channel appended blocks are announced on.
    pub notify_channel: String,
    /// How long a single dequeue may block waiting for an item.
    pub dequeue_timeout: Duration,
    /// Fixed backoff after the queue is found unreachable.
    pub retry_delay: Duration,
    /// Consecutive queue failures after which `run` gives up.
    ///
    /// `None` retries forever.
    pub max_consecutive_queue_failures: Option<u32>,
    /// Pause after every iteration, so the loop never spins hot.
    pub iteration_pause: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            notify_channel: DEFAULT_NOTIFY_CHANNEL.to_string(),
            dequeue_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
            max_consecutive_queue_failures: None,
            iteration_pause: Duration::from_millis(500),
        }
    }
}
