//! Block-created notifications.
//!
//! After every append the pipeline publishes the serialized block on a
//! channel. Delivery is fire-and-forget: nobody in the validator listens,
//! and a failed publish is only logged.

use std::sync::mpsc::Sender;
use std::time::Duration;

use thiserror::Error;

use crate::types::Block;

use super::QueueError;
use super::redis::RedisConnector;

/// Errors raised while publishing a block.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to serialize block: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("notification receiver has gone away")]
    Closed,
}

/// Publish-only sink for appended blocks.
pub trait BlockNotifier: Send {
    fn publish(&mut self, channel: &str, block: &Block) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl BlockNotifier for NoopNotifier {
    fn publish(&mut self, _channel: &str, _block: &Block) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Forwards `(channel, block)` pairs over an in-process channel.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: Sender<(String, Block)>,
}

impl ChannelNotifier {
    pub fn new(tx: Sender<(String, Block)>) -> Self {
        Self { tx }
    }
}

impl BlockNotifier for ChannelNotifier {
    fn publish(&mut self, channel: &str, block: &Block) -> Result<(), NotifyError> {
        self.tx
            .send((channel.to_string(), block.clone()))
            .map_err(|_| NotifyError::Closed)
    }
}

/// Publishes blocks with Redis `PUBLISH`.
pub struct RedisBlockNotifier {
    connector: RedisConnector,
}

impl RedisBlockNotifier {
    pub fn new(connector: RedisConnector) -> Self {
        Self { connector }
    }

    pub fn connect(url: &str, connect_timeout: Duration) -> Result<Self, QueueError> {
        Ok(Self::new(RedisConnector::new(url, connect_timeout)?))
    }
}

impl BlockNotifier for RedisBlockNotifier {
    fn publish(&mut self, channel: &str, block: &Block) -> Result<(), NotifyError> {
        let payload = block.to_json()?;
        self.connector.with_connection(|conn| {
            redis::cmd("PUBLISH")
                .arg(channel)
                .arg(&payload)
                .query::<i64>(conn)
        })?;
        Ok(())
    }
}
