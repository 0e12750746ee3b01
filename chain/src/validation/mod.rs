//! Transaction validity checks for the chain.
//!
//! This module provides the pieces the validation pipeline combines:
//!
//! - [`verifier::VerificationClient`]: signature and proof checks against
//!   external services, reporting a tri-state [`VerificationResult`].
//! - [`parity::ParityPredicate`]: the numeric-parity consensus rule that
//!   plugs into [`crate::consensus::validator::ConsensusPredicate`].

pub mod parity;
pub mod verifier;

pub use parity::{ParityPredicate, numeric_parity};
pub use verifier::{VerificationClient, VerificationResult, VerifyError};
