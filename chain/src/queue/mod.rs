//! Work queue and notification adapters.
//!
//! The validator consumes pending transactions from a durable, blocking
//! FIFO list and announces every appended block on a publish-only channel.
//! This module defines the [`WorkQueue`] and [`notify::BlockNotifier`]
//! seams and provides:
//!
//! - a Redis adapter ([`redis::RedisWorkQueue`], [`notify::RedisBlockNotifier`])
//!   for deployed validators,
//! - an in-process queue ([`mem::MemoryWorkQueue`]) for tests and embedded
//!   setups.

use std::time::Duration;

use thiserror::Error;

use crate::types::Transaction;

pub mod mem;
pub mod notify;
pub mod redis;

pub use mem::MemoryWorkQueue;
pub use notify::{BlockNotifier, ChannelNotifier, NoopNotifier, NotifyError, RedisBlockNotifier};
pub use redis::{RedisConnector, RedisWorkQueue};

/// List producers push pending transactions onto.
pub const DEFAULT_QUEUE_NAME: &str = "pending_transactions";

/// Channel every appended block is published on.
pub const DEFAULT_NOTIFY_CHANNEL: &str = "new_block_channel";

/// Errors reported by a [`WorkQueue`].
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue service cannot be reached. Recoverable: back off and retry.
    #[error("queue service unavailable: {0}")]
    Unavailable(String),
    /// An item was dequeued but is not transaction data. It is gone from the
    /// queue; the caller should log and move on.
    #[error("malformed queue message: {0}")]
    Malformed(String),
    /// The service answered with an unexpected error.
    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Durable, blocking, at-least-once FIFO queue of pending transactions.
///
/// Producers and the single validator consumer share the queue. An item
/// popped and then lost to a crash is acceptable data loss.
pub trait WorkQueue: Send {
    /// Pops the oldest transaction from `queue`, blocking up to `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time; that is the normal
    /// idle case, not an error.
    fn dequeue_blocking(
        &mut self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<Transaction>, QueueError>;

    /// Pushes a transaction onto `queue` (producer side).
    fn enqueue(&mut self, queue: &str, tx: &Transaction) -> Result<(), QueueError>;

    /// Number of transactions waiting in `queue`.
    fn pending_len(&mut self, queue: &str) -> Result<usize, QueueError>;
}

/// Decodes a raw queue payload into a transaction.
///
/// Payloads are raw bytes so that invalid UTF-8 is reported as
/// [`QueueError::Malformed`] like any other undecodable message.
pub(crate) fn decode_payload(payload: &[u8]) -> Result<Transaction, QueueError> {
    serde_json::from_slice(payload).map_err(|e| QueueError::Malformed(e.to_string()))
}

/// Encodes a transaction into its queued form.
pub(crate) fn encode_payload(tx: &Transaction) -> Result<String, QueueError> {
    tx.to_json()
        .map_err(|e| QueueError::Backend(format!("failed to encode transaction: {e}")))
}
