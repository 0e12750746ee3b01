//! In-process work queue.
//!
//! [`MemoryWorkQueue`] mirrors the Redis list semantics the validator relies
//! on (push at the head, blocking pop from the tail) without any external
//! service. Clones share the same underlying lists, so a test can keep one
//! handle as the producer while the pipeline owns another.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::types::Transaction;

use super::{QueueError, WorkQueue, decode_payload, encode_payload};

#[derive(Default)]
struct Lists {
    lists: HashMap<String, VecDeque<String>>,
    unavailable: bool,
}

#[derive(Default)]
struct Shared {
    lists: Mutex<Lists>,
    pushed: Condvar,
}

/// Shared in-memory implementation of [`WorkQueue`].
#[derive(Clone, Default)]
pub struct MemoryWorkQueue {
    shared: Arc<Shared>,
}

impl MemoryWorkQueue {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a raw payload, which need not be valid transaction JSON.
    pub fn push_raw(&self, queue: &str, payload: impl Into<String>) {
        let mut guard = self.lock();
        guard
            .lists
            .entry(queue.to_string())
            .or_default()
            .push_front(payload.into());
        drop(guard);
        self.shared.pushed.notify_all();
    }

    /// Simulates the queue service going away (`false`) or coming back.
    ///
    /// While unavailable every operation fails with
    /// [`QueueError::Unavailable`]; queued items are kept.
    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
        self.shared.pushed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Lists> {
        self.shared
            .lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn unavailable() -> QueueError {
    QueueError::Unavailable("in-memory queue marked unavailable".to_string())
}

impl WorkQueue for MemoryWorkQueue {
    fn dequeue_blocking(
        &mut self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<Transaction>, QueueError> {
        let guard = self.lock();
        let (mut guard, _) = self
            .shared
            .pushed
            .wait_timeout_while(guard, timeout, |l| {
                !l.unavailable && l.lists.get(queue).is_none_or(VecDeque::is_empty)
            })
            .unwrap_or_else(PoisonError::into_inner);

        if guard.unavailable {
            return Err(unavailable());
        }

        match guard.lists.get_mut(queue).and_then(VecDeque::pop_back) {
            Some(payload) => decode_payload(payload.as_bytes()).map(Some),
            None => Ok(None),
        }
    }

    fn enqueue(&mut self, queue: &str, tx: &Transaction) -> Result<(), QueueError> {
        if self.lock().unavailable {
            return Err(unavailable());
        }
        let payload = encode_payload(tx)?;
        self.push_raw(queue, payload);
        Ok(())
    }

    fn pending_len(&mut self, queue: &str) -> Result<usize, QueueError> {
        let guard = self.lock();
        if guard.unavailable {
            return Err(unavailable());
        }
        Ok(guard.lists.get(queue).map_or(0, VecDeque::len))
    }
}
