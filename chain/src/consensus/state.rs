//! Pipeline states and per-iteration outcomes.

use std::fmt;

use crate::types::Block;

/// Where the validation loop currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    WaitingForItem,
    VerifyingSignature,
    VerifyingProof,
    ApplyingConsensus,
    Appending,
    /// The work queue is unreachable; the loop is backing off.
    Disconnected,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::WaitingForItem => "waiting_for_item",
            PipelineState::VerifyingSignature => "verifying_signature",
            PipelineState::VerifyingProof => "verifying_proof",
            PipelineState::ApplyingConsensus => "applying_consensus",
            PipelineState::Appending => "appending",
            PipelineState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transaction was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// `signed_data`, `original_data` or `public_key` is missing.
    MissingSignatureMaterial,
    SignatureInvalid,
    SignatureUnreachable,
    ProofInvalid,
    ProofUnreachable,
    /// Cryptographic checks passed but the consensus predicate said no.
    ConsensusRejected,
}

impl RejectReason {
    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::MissingSignatureMaterial => "missing_signature_material",
            RejectReason::SignatureInvalid => "signature_invalid",
            RejectReason::SignatureUnreachable => "signature_unreachable",
            RejectReason::ProofInvalid => "proof_invalid",
            RejectReason::ProofUnreachable => "proof_unreachable",
            RejectReason::ConsensusRejected => "consensus_rejected",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one loop iteration.
#[derive(Clone, Debug, PartialEq)]
pub enum IterationOutcome {
    /// The dequeue timed out with nothing to do.
    Idle,
    /// The transaction was sealed into this block.
    Accepted(Block),
    Rejected(RejectReason),
    /// The dequeued payload was not transaction data and was dropped.
    Malformed(String),
    /// The queue could not be reached.
    Disconnected(String),
    /// Something unexpected went wrong inside the iteration.
    Failed(String),
}

impl IterationOutcome {
    /// `true` if a transaction was taken off the queue, whatever its fate.
    pub fn consumed_item(&self) -> bool {
        matches!(
            self,
            IterationOutcome::Accepted(_)
                | IterationOutcome::Rejected(_)
                | IterationOutcome::Malformed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_labels_are_snake_case() {
        assert_eq!(
            RejectReason::MissingSignatureMaterial.to_string(),
            "missing_signature_material"
        );
        assert_eq!(RejectReason::ProofUnreachable.as_str(), "proof_unreachable");
    }

    #[test]
    fn only_item_outcomes_count_as_consumed() {
        assert!(IterationOutcome::Rejected(RejectReason::SignatureInvalid).consumed_item());
        assert!(IterationOutcome::Malformed("bad".into()).consumed_item());
        assert!(!IterationOutcome::Idle.consumed_item());
        assert!(!IterationOutcome::Disconnected("down".into()).consumed_item());
        assert!(!IterationOutcome::Failed("boom".into()).consumed_item());
    }

    #[test]
    fn pipeline_starts_waiting_for_an_item() {
        assert_eq!(PipelineState::default(), PipelineState::WaitingForItem);
    }
}
