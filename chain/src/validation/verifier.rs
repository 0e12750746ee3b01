//! Cryptographic verification interface used by the validation pipeline.
//!
//! Signature and proof checks are delegated to external services. This
//! module defines the [`VerificationClient`] trait that abstracts over them
//! and the tri-state [`VerificationResult`] every check reports.

use serde_json::Value;
use thiserror::Error;

/// Outcome of a single verification call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerificationResult {
    /// The service confirmed the signature or proof.
    Valid,
    /// The service rejected it, or answered with something unusable.
    Invalid,
    /// The service could not be reached in time.
    ///
    /// Counts as a rejection, but is kept separate so operators can tell a
    /// bad transaction from a sick dependency.
    Unreachable,
}

impl VerificationResult {
    /// Maps a service verdict onto a result.
    pub fn from_verdict(is_valid: bool) -> Self {
        if is_valid { Self::Valid } else { Self::Invalid }
    }

    /// Returns `true` only for [`VerificationResult::Valid`].
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Errors that can occur while contacting a verification service.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Transport-level error (connection refused, timeout, DNS, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with a non-success HTTP status.
    #[error("service error: {0}")]
    Service(String),
    /// The service returned a malformed or unexpected response.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl VerifyError {
    /// How a failed call counts towards acceptance.
    ///
    /// Only transport failures are `Unreachable`; a service that answered,
    /// even badly, has effectively said "not valid".
    pub fn as_result(&self) -> VerificationResult {
        match self {
            VerifyError::Transport(_) => VerificationResult::Unreachable,
            VerifyError::Service(_) | VerifyError::Protocol(_) => VerificationResult::Invalid,
        }
    }
}

/// Abstract verification client used by the validation pipeline.
///
/// Both calls are side-effect free and idempotent. The pipeline issues at
/// most one of each per transaction and never retries them.
pub trait VerificationClient: Send {
    /// Checks `signed_data` against `original_data` under `public_key`.
    fn verify_signature(
        &self,
        signed_data: &str,
        original_data: &str,
        public_key: &str,
    ) -> VerificationResult;

    /// Checks an attached proof object for `original_data`.
    fn verify_proof(&self, proof_data: &Value, original_data: &str) -> VerificationResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_valid_counts_as_valid() {
        assert!(VerificationResult::Valid.is_valid());
        assert!(!VerificationResult::Invalid.is_valid());
        assert!(!VerificationResult::Unreachable.is_valid());
    }

    #[test]
    fn verdicts_map_to_results() {
        assert_eq!(VerificationResult::from_verdict(true), VerificationResult::Valid);
        assert_eq!(VerificationResult::from_verdict(false), VerificationResult::Invalid);
    }

    #[test]
    fn transport_errors_are_unreachable_everything_else_invalid() {
        assert_eq!(
            VerifyError::Transport("refused".into()).as_result(),
            VerificationResult::Unreachable
        );
        assert_eq!(
            VerifyError::Service("HTTP 400".into()).as_result(),
            VerificationResult::Invalid
        );
        assert_eq!(
            VerifyError::Protocol("bad json".into()).as_result(),
            VerificationResult::Invalid
        );
    }
}
