//! Core domain types used by the chain
//!
//! This module defines the transaction shape the validator consumes from
//! the work queue, the single-transaction [`Block`] it appends, and the
//! strongly-typed content hash used to link blocks together.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Block type, canonical encoding and hashing.
pub mod block;
/// Transactions as delivered by the work queue.
pub mod tx;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use tx::{SignatureMaterial, Transaction};

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Validator identity stamped into every block unless configured otherwise.
pub const DEFAULT_VALIDATOR_ID: &str = "PoPV-Validator-001";

/// Strongly-typed 256-bit hash wrapper (BLAKE3-256).
///
/// Blocks carry their hash as a lowercase hex string so that the chain can
/// be served as JSON verbatim; this type is the binary form behind it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the BLAKE3-256 hash of `data`.
    ///
    /// The result is deterministic for a given byte slice and is suitable
    /// for use as a content hash, but it is **not** a password hash or KDF.
    pub fn compute(data: &[u8]) -> Self {
        let h = blake3::hash(data);
        Hash256(*h.as_bytes())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex encoding, as stored in [`Block::hash`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
