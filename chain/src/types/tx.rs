// chain/src/types/tx.rs

//! Transactions as delivered by the work queue.
//!
//! Producers push loosely-structured JSON objects onto the pending queue.
//! The validator only interprets four of their fields:
//!
//! - `original_data`: the payload the signature covers,
//! - `signed_data`: hex-encoded signature over `original_data`,
//! - `public_key`: hex-encoded verifying key,
//! - `stark_proof`: an opaque proof object produced by the proof service.
//!
//! Anything else the producer attached is carried through untouched so the
//! block records the transaction exactly as it was submitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A pending transaction.
///
/// Every interpreted field is optional at the type level: a transaction
/// without signature material still decodes, it is simply never accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Payload covered by the signature and inspected by the consensus
    /// predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_data: Option<String>,

    /// Hex-encoded signature over `original_data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_data: Option<String>,

    /// Hex-encoded public key of the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Simulated STARK proof attached by the proof service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stark_proof: Option<Value>,

    /// Producer-defined fields (sender, recipient, amount, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Borrowed view of the three fields a signature check needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureMaterial<'a> {
    pub signed_data: &'a str,
    pub original_data: &'a str,
    pub public_key: &'a str,
}

impl Transaction {
    /// Creates a bare transaction carrying only `original_data`.
    pub fn new(original_data: impl Into<String>) -> Self {
        Self {
            original_data: Some(original_data.into()),
            ..Self::default()
        }
    }

    /// Attaches signature material.
    pub fn with_signature(
        mut self,
        signed_data: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        self.signed_data = Some(signed_data.into());
        self.public_key = Some(public_key.into());
        self
    }

    /// Attaches a proof object.
    pub fn with_proof(mut self, proof: Value) -> Self {
        self.stark_proof = Some(proof);
        self
    }

    /// Decodes a transaction from its queued JSON form.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Encodes the transaction into the JSON form producers enqueue.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns the signature material if all three fields are present and
    /// non-empty.
    pub fn signature_material(&self) -> Option<SignatureMaterial<'_>> {
        Some(SignatureMaterial {
            signed_data: non_empty(&self.signed_data)?,
            original_data: non_empty(&self.original_data)?,
            public_key: non_empty(&self.public_key)?,
        })
    }

    /// Returns the attached proof, treating empty values (`null`, `false`,
    /// `0`, `""`, `[]`, `{}`) as absent.
    pub fn proof(&self) -> Option<&Value> {
        self.stark_proof.as_ref().filter(|proof| !is_empty_value(proof))
    }

    /// Short label for log lines.
    pub fn label(&self) -> &str {
        self.original_data.as_deref().unwrap_or("N/A")
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_queued_payload_and_keeps_unknown_fields() {
        let payload = r#"{
            "original_data": "4",
            "signed_data": "ab12",
            "public_key": "cd34",
            "stark_proof": {"proof_id": "STARK-PROOF-1", "valid": true},
            "sender": "alice",
            "amount": 10.5
        }"#;

        let tx = Transaction::from_json(payload).expect("payload should decode");

        assert_eq!(tx.original_data.as_deref(), Some("4"));
        assert_eq!(tx.extra.get("sender"), Some(&json!("alice")));
        assert_eq!(tx.extra.get("amount"), Some(&json!(10.5)));
        assert!(tx.proof().is_some());

        let reencoded: Value = serde_json::to_value(&tx).unwrap();
        assert_eq!(reencoded["sender"], json!("alice"));
        assert_eq!(reencoded["stark_proof"]["valid"], json!(true));
    }

    #[test]
    fn missing_fields_are_not_serialized() {
        let tx = Transaction::new("hello");
        let value = serde_json::to_value(&tx).unwrap();

        assert_eq!(value, json!({"original_data": "hello"}));
    }

    #[test]
    fn signature_material_requires_all_three_non_empty_fields() {
        assert!(Transaction::new("4").signature_material().is_none());

        let full = Transaction::new("4").with_signature("ab12", "cd34");
        let material = full.signature_material().expect("complete material");
        assert_eq!(material.signed_data, "ab12");
        assert_eq!(material.original_data, "4");
        assert_eq!(material.public_key, "cd34");

        let empty_sig = Transaction::new("4").with_signature("", "cd34");
        assert!(empty_sig.signature_material().is_none());

        let no_data = Transaction {
            original_data: None,
            ..Transaction::new("x").with_signature("ab12", "cd34")
        };
        assert!(no_data.signature_material().is_none());
    }

    #[test]
    fn null_and_empty_proofs_count_as_absent() {
        let tx = Transaction::from_json(r#"{"original_data": "1", "stark_proof": null}"#).unwrap();
        assert!(tx.proof().is_none());

        for empty in [json!({}), json!([]), json!(""), json!(false), json!(0), json!(0.0)] {
            let tx = Transaction::new("1").with_proof(empty.clone());
            assert!(tx.proof().is_none(), "{empty} should count as absent");
        }

        let tx = Transaction::new("1").with_proof(json!("STARK-PROOF-1"));
        assert!(tx.proof().is_some());

        let tx = Transaction::new("1").with_proof(json!({"valid": false}));
        assert!(tx.proof().is_some());
    }

    #[test]
    fn non_string_original_data_is_a_decode_error() {
        assert!(Transaction::from_json(r#"{"original_data": 4}"#).is_err());
        assert!(Transaction::from_json("[1, 2, 3]").is_err());
        assert!(Transaction::from_json("not json").is_err());
    }

    #[test]
    fn label_falls_back_for_missing_data() {
        assert_eq!(Transaction::default().label(), "N/A");
        assert_eq!(Transaction::new("7").label(), "7");
    }
}
