// chain/src/types/block.rs

//! Block type and hashing.
//!
//! Each block wraps exactly one accepted [`Transaction`]. Blocks are linked
//! through `previous_hash`, and `hash` is a BLAKE3-256 digest over a
//! canonical JSON encoding of every other field.
//!
//! The canonical encoding sorts object keys at every nesting level before
//! serializing, so the digest does not depend on the order in which a
//! producer happened to write the transaction's fields, nor on whether
//! `serde_json` preserves insertion order in this build.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Hash256, Transaction};

/// `previous_hash` of the first block in the chain.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A single-transaction block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Wall-clock time of block creation, in seconds since Unix epoch.
    pub timestamp: f64,

    /// Transactions sealed into this block. Always exactly one for blocks
    /// produced by the validation pipeline.
    pub transactions: Vec<Transaction>,

    /// `hash` of the preceding block, or [`GENESIS_PREVIOUS_HASH`].
    pub previous_hash: String,

    /// Identity of the validator that appended the block.
    pub validator_id: String,

    /// 1-based position of the block in the chain.
    pub block_number: u64,

    /// Hex digest of [`Block::canonical_bytes`].
    pub hash: String,
}

impl Block {
    /// Builds a block around `transaction` and seals it with its hash.
    pub fn seal(
        transaction: Transaction,
        previous_hash: impl Into<String>,
        validator_id: impl Into<String>,
        block_number: u64,
        timestamp: f64,
    ) -> Self {
        let mut block = Block {
            timestamp,
            transactions: vec![transaction],
            previous_hash: previous_hash.into(),
            validator_id: validator_id.into(),
            block_number,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Returns the canonical byte representation used for hashing.
    ///
    /// All fields except `hash` are encoded as a JSON object whose keys are
    /// sorted recursively. All hashing that depends on a "canonical" form
    /// must go through this method to avoid format drift.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails. This is considered a programming error,
    /// because every field is plain JSON data with string keys.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let fields = json!({
            "block_number": self.block_number,
            "previous_hash": self.previous_hash,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "validator_id": self.validator_id,
        });
        serde_json::to_vec(&canonicalize(fields))
            .expect("Block fields should always be serializable to JSON")
    }

    /// Computes the hex digest of this block's canonical encoding.
    pub fn compute_hash(&self) -> String {
        Hash256::compute(&self.canonical_bytes()).to_hex()
    }

    /// Returns `true` if the stored `hash` matches the block's content.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// The transaction sealed into this block.
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// Encodes the block as published on the notification channel.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Rebuilds `value` with every object's keys in lexicographic order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        let tx = Transaction::new("4").with_signature("ab12", "cd34");
        Block::seal(tx, GENESIS_PREVIOUS_HASH, "PoPV-Validator-001", 1, 1_700_000_000.25)
    }

    #[test]
    fn block_hash_is_deterministic() {
        let block = sample_block();

        assert_eq!(block.hash, block.compute_hash());
        assert_eq!(block.hash.len(), 64);
        assert!(block.verify_hash());
    }

    #[test]
    fn hash_ignores_producer_field_order() {
        let a = Transaction::from_json(
            r#"{"original_data":"4","signed_data":"ab12","public_key":"cd34","sender":"alice","amount":3}"#,
        )
        .unwrap();
        let b = Transaction::from_json(
            r#"{"amount":3,"sender":"alice","public_key":"cd34","signed_data":"ab12","original_data":"4"}"#,
        )
        .unwrap();

        let block_a = Block::seal(a, "0", "v", 1, 10.0);
        let block_b = Block::seal(b, "0", "v", 1, 10.0);

        assert_eq!(block_a.hash, block_b.hash);
    }

    #[test]
    fn canonical_bytes_sort_nested_keys_and_exclude_hash() {
        let tx = Transaction::new("x").with_proof(json!({"z": 1, "a": {"d": 2, "b": 3}}));
        let block = Block::seal(tx, "0", "v", 1, 1.5);

        let text = String::from_utf8(block.canonical_bytes()).unwrap();

        assert!(text.starts_with(r#"{"block_number":1,"previous_hash":"0","timestamp":1.5"#));
        assert!(text.contains(r#""stark_proof":{"a":{"b":3,"d":2},"z":1}"#));
        assert!(!text.contains(&block.hash));
    }

    #[test]
    fn tampering_with_any_field_breaks_the_hash() {
        let block = sample_block();

        let mut tampered = block.clone();
        tampered.block_number = 2;
        assert!(!tampered.verify_hash());

        let mut tampered = block.clone();
        tampered.previous_hash = "deadbeef".to_string();
        assert!(!tampered.verify_hash());

        let mut tampered = block;
        tampered.transactions[0].original_data = Some("6".to_string());
        assert!(!tampered.verify_hash());
    }

    #[test]
    fn hash_survives_json_roundtrip() {
        let block = sample_block();
        let json = block.to_json().unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, block);
        assert!(decoded.verify_hash());
    }
}
