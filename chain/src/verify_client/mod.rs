//! Clients for the external verification services.
//!
//! This module provides concrete implementations of the generic
//! [`crate::validation::VerificationClient`] trait. These clients talk to
//! the signature service and the proof service over HTTP and translate
//! their answers into [`crate::validation::VerificationResult`] values.

pub mod http;

pub use http::HttpVerificationClient;
