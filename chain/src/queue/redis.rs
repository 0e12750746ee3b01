//! Redis-backed work queue.
//!
//! Producers `LPUSH` JSON transactions onto a list and the validator pops
//! them with `BRPOP`, so the list behaves as a FIFO end-to-end.
//!
//! The connection is opened lazily and dropped as soon as Redis stops
//! answering; the next call reconnects. Callers see a dropped connection as
//! [`QueueError::Unavailable`] and are expected to back off.

use std::time::Duration;

use redis::{Client, Connection, RedisError, RedisResult};
use tracing::{debug, info, warn};

use crate::types::Transaction;

use super::{QueueError, WorkQueue, decode_payload, encode_payload};

/// Extra read time granted on top of a blocking command's own timeout.
const READ_TIMEOUT_SLACK: Duration = Duration::from_secs(1);

/// Lazily (re)connecting handle to a Redis server.
pub struct RedisConnector {
    client: Client,
    conn: Option<Connection>,
    connect_timeout: Duration,
}

impl RedisConnector {
    /// Creates a connector for `url` (for example `redis://127.0.0.1:6379/`).
    ///
    /// No connection is made until the first command.
    pub fn new(url: &str, connect_timeout: Duration) -> Result<Self, QueueError> {
        let client = Client::open(url)
            .map_err(|e| QueueError::Backend(format!("invalid Redis URL {url}: {e}")))?;

        Ok(Self {
            client,
            conn: None,
            connect_timeout,
        })
    }

    /// Returns `true` if a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn open(&self) -> Result<Connection, QueueError> {
        let mut conn = self
            .client
            .get_connection_with_timeout(self.connect_timeout)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        redis::cmd("PING")
            .query::<String>(&mut conn)
            .map_err(|e| QueueError::Unavailable(format!("PING failed: {e}")))?;

        info!("connected to Redis");
        Ok(conn)
    }

    /// Runs `f` on a live connection, connecting first if needed.
    ///
    /// Connection-level failures drop the connection and surface as
    /// [`QueueError::Unavailable`]; any other Redis error is
    /// [`QueueError::Backend`] and keeps the connection.
    pub fn with_connection<T>(
        &mut self,
        f: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> Result<T, QueueError> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open()?,
        };

        match f(&mut conn) {
            Ok(value) => {
                self.conn = Some(conn);
                Ok(value)
            }
            Err(e) if is_connection_error(&e) => {
                warn!(error = %e, "lost Redis connection");
                Err(QueueError::Unavailable(e.to_string()))
            }
            Err(e) => {
                self.conn = Some(conn);
                Err(QueueError::Backend(e.to_string()))
            }
        }
    }
}

fn is_connection_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
}

/// `BRPOP` takes whole seconds; zero would mean "block forever".
fn brpop_timeout_secs(timeout: Duration) -> u64 {
    timeout.as_secs().max(1)
}

/// [`WorkQueue`] over Redis lists.
pub struct RedisWorkQueue {
    connector: RedisConnector,
}

impl RedisWorkQueue {
    pub fn new(connector: RedisConnector) -> Self {
        Self { connector }
    }

    /// Convenience constructor from a URL.
    pub fn connect(url: &str, connect_timeout: Duration) -> Result<Self, QueueError> {
        Ok(Self::new(RedisConnector::new(url, connect_timeout)?))
    }
}

impl WorkQueue for RedisWorkQueue {
    fn dequeue_blocking(
        &mut self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<Transaction>, QueueError> {
        let secs = brpop_timeout_secs(timeout);
        let popped = self.connector.with_connection(|conn| {
            conn.set_read_timeout(Some(Duration::from_secs(secs) + READ_TIMEOUT_SLACK))?;
            redis::cmd("BRPOP")
                .arg(queue)
                .arg(secs)
                .query::<Option<(String, Vec<u8>)>>(conn)
        })?;

        match popped {
            Some((_, payload)) => {
                debug!(queue, bytes = payload.len(), "dequeued transaction");
                decode_payload(&payload).map(Some)
            }
            None => Ok(None),
        }
    }

    fn enqueue(&mut self, queue: &str, tx: &Transaction) -> Result<(), QueueError> {
        let payload = encode_payload(tx)?;
        self.connector.with_connection(|conn| {
            redis::cmd("LPUSH")
                .arg(queue)
                .arg(&payload)
                .query::<i64>(conn)
        })?;
        Ok(())
    }

    fn pending_len(&mut self, queue: &str) -> Result<usize, QueueError> {
        self.connector
            .with_connection(|conn| redis::cmd("LLEN").arg(queue).query::<usize>(conn))
    }
}
