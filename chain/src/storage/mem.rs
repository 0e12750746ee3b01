//! In-memory, append-only chain.
//!
//! [`ChainBuilder`] owns the block list and is the only type that can grow
//! it. Every append publishes a fresh [`ChainSnapshot`] through a
//! `tokio::sync::watch` channel, so status readers on other threads or
//! tasks observe the chain without ever taking a lock on the writer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::watch;

use crate::types::{Block, GENESIS_PREVIOUS_HASH, Transaction};

/// Read-only view of the chain tip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainSnapshot {
    /// Number of blocks in the chain.
    pub length: usize,
    /// Most recently appended block, if any.
    pub last_block: Option<Block>,
}

/// Cloneable handle for concurrent readers.
///
/// A reader may observe a snapshot that is one append behind the writer;
/// that is fine for status reporting.
#[derive(Clone, Debug)]
pub struct ChainReader {
    rx: watch::Receiver<ChainSnapshot>,
}

impl ChainReader {
    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> ChainSnapshot {
        self.rx.borrow().clone()
    }
}

/// Integrity violations reported by [`ChainBuilder::verify`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainIntegrityError {
    #[error("block at index {index} has number {found}, expected {expected}")]
    BlockNumber {
        index: usize,
        expected: u64,
        found: u64,
    },
    #[error("block {block_number} does not link to its predecessor")]
    Linkage { block_number: u64 },
    #[error("block {block_number} hash does not match its content")]
    Hash { block_number: u64 },
}

/// Single-writer owner of the chain.
#[derive(Debug)]
pub struct ChainBuilder {
    validator_id: String,
    blocks: Vec<Block>,
    published: watch::Sender<ChainSnapshot>,
}

impl ChainBuilder {
    /// Creates an empty chain whose blocks will be stamped with
    /// `validator_id`.
    pub fn new(validator_id: impl Into<String>) -> Self {
        let (published, _) = watch::channel(ChainSnapshot::default());
        Self {
            validator_id: validator_id.into(),
            blocks: Vec::new(),
            published,
        }
    }

    /// Validator identity stamped into appended blocks.
    pub fn validator_id(&self) -> &str {
        &self.validator_id
    }

    /// Returns a handle that can be moved to reader threads or tasks.
    pub fn reader(&self) -> ChainReader {
        ChainReader {
            rx: self.published.subscribe(),
        }
    }

    /// Number of blocks in the chain.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if no block has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks, oldest first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Most recently appended block.
    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Current length and tip, straight from the owner.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            length: self.blocks.len(),
            last_block: self.blocks.last().cloned(),
        }
    }

    /// Seals `transaction` into a new block stamped with the current time
    /// and appends it.
    pub fn append(&mut self, transaction: Transaction) -> Block {
        self.append_at(transaction, current_unix_timestamp())
    }

    /// Seals `transaction` into a new block with an explicit timestamp.
    ///
    /// The block number is derived from the current length and the
    /// previous hash from the current tip, so the chain stays gap-free and
    /// linked no matter how callers interleave appends.
    pub fn append_at(&mut self, transaction: Transaction, timestamp: f64) -> Block {
        let previous_hash = self
            .blocks
            .last()
            .map_or_else(|| GENESIS_PREVIOUS_HASH.to_string(), |b| b.hash.clone());
        let block_number = self.blocks.len() as u64 + 1;

        let block = Block::seal(
            transaction,
            previous_hash,
            self.validator_id.clone(),
            block_number,
            timestamp,
        );

        self.blocks.push(block.clone());
        self.published.send_replace(ChainSnapshot {
            length: self.blocks.len(),
            last_block: Some(block.clone()),
        });

        block
    }

    /// Re-checks numbering, linkage and every block hash.
    pub fn verify(&self) -> Result<(), ChainIntegrityError> {
        let mut expected_previous: &str = GENESIS_PREVIOUS_HASH;

        for (index, block) in self.blocks.iter().enumerate() {
            let expected = index as u64 + 1;
            if block.block_number != expected {
                return Err(ChainIntegrityError::BlockNumber {
                    index,
                    expected,
                    found: block.block_number,
                });
            }
            if block.previous_hash != expected_previous {
                return Err(ChainIntegrityError::Linkage {
                    block_number: block.block_number,
                });
            }
            if !block.verify_hash() {
                return Err(ChainIntegrityError::Hash {
                    block_number: block.block_number,
                });
            }
            expected_previous = block.hash.as_str();
        }

        Ok(())
    }
}

/// Returns the current wall-clock time as fractional seconds since Unix
/// epoch.
///
/// On error (system clock before epoch) this falls back to 0.
fn current_unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs_f64()
}
