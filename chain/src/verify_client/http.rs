//! HTTP-based verification client.
//!
//! This implementation of [`crate::validation::VerificationClient`] talks
//! to two JSON services:
//!
//! ```json
//! POST {signature_url}/verify
//! { "signed_data": "ab12...", "original_data": "4", "public_key": "cd34..." }
//!
//! POST {proof_url}/verify_proof
//! { "proof_data": { "proof_id": "STARK-PROOF-...", "valid": true }, "original_data": "4" }
//!
//! Response (both):
//! { "is_valid": true }
//! ```
//!
//! A response without `is_valid` is read as a negative verdict.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::validation::{VerificationClient, VerificationResult, VerifyError};

/// HTTP verification client for the signature and proof services.
///
/// This client is `Send + Sync` and uses the blocking `reqwest` client
/// internally, so it must be built and used off the async runtime (the
/// validator runs it on its dedicated pipeline thread).
pub struct HttpVerificationClient {
    signature_url: String,
    proof_url: String,
    client: Client,
}

impl HttpVerificationClient {
    /// Constructs a client for the services rooted at `signature_url` and
    /// `proof_url` (without a trailing slash), with a per-request
    /// `timeout`.
    pub fn new(
        signature_url: impl Into<String>,
        proof_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifyError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            signature_url: signature_url.into(),
            proof_url: proof_url.into(),
            client,
        })
    }

    /// Sends a signature verification request and returns the verdict.
    pub fn request_signature_verdict(
        &self,
        signed_data: &str,
        original_data: &str,
        public_key: &str,
    ) -> Result<bool, VerifyError> {
        let url = endpoint(&self.signature_url, "/verify");
        self.post_verify(
            &url,
            &SignatureRequest {
                signed_data,
                original_data,
                public_key,
            },
        )
    }

    /// Sends a proof verification request and returns the verdict.
    pub fn request_proof_verdict(
        &self,
        proof_data: &Value,
        original_data: &str,
    ) -> Result<bool, VerifyError> {
        let url = endpoint(&self.proof_url, "/verify_proof");
        self.post_verify(
            &url,
            &ProofRequest {
                proof_data,
                original_data,
            },
        )
    }

    fn post_verify<B: Serialize>(&self, url: &str, body: &B) -> Result<bool, VerifyError> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| VerifyError::Transport(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VerifyError::Service(format!(
                "{url} returned HTTP status {status}"
            )));
        }

        // A stall or drop mid-body is a network failure, not a bad answer.
        let bytes = resp.bytes().map_err(|e| {
            VerifyError::Transport(format!("reading response from {url} failed: {e}"))
        })?;

        let body = serde_json::from_slice::<VerifyResponse>(&bytes)
            .map_err(|e| VerifyError::Protocol(format!("failed to parse JSON from {url}: {e}")))?;

        Ok(body.is_valid.unwrap_or(false))
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    // Avoid accidental double slashes.
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn into_result(check: &'static str, outcome: Result<bool, VerifyError>) -> VerificationResult {
    match outcome {
        Ok(is_valid) => {
            debug!(check, is_valid, "verification service answered");
            VerificationResult::from_verdict(is_valid)
        }
        Err(e) => {
            warn!(check, error = %e, "verification call failed");
            e.as_result()
        }
    }
}

/// Request payload sent to the signature service.
#[derive(Debug, Serialize)]
struct SignatureRequest<'a> {
    signed_data: &'a str,
    original_data: &'a str,
    public_key: &'a str,
}

/// Request payload sent to the proof service.
#[derive(Debug, Serialize)]
struct ProofRequest<'a> {
    proof_data: &'a Value,
    original_data: &'a str,
}

/// Response payload returned by both services.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    is_valid: Option<bool>,
}

impl VerificationClient for HttpVerificationClient {
    fn verify_signature(
        &self,
        signed_data: &str,
        original_data: &str,
        public_key: &str,
    ) -> VerificationResult {
        into_result(
            "signature",
            self.request_signature_verdict(signed_data, original_data, public_key),
        )
    }

    fn verify_proof(&self, proof_data: &Value, original_data: &str) -> VerificationResult {
        into_result(
            "proof",
            self.request_proof_verdict(proof_data, original_data),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    /// Consumes one HTTP request so the reply is not cut short by a reset.
    fn read_request(stream: &TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap_or(0) > 0 {
            if line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            line.clear();
        }
        let mut body = vec![0; content_length];
        let _ = reader.read_exact(&mut body);
    }

    /// One-shot HTTP server that writes `response` and then holds the
    /// connection open for `hold`.
    fn serve_once(response: &'static [u8], hold: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&stream);
            let _ = stream.write_all(response);
            let _ = stream.flush();
            thread::sleep(hold);
        });

        format!("http://{addr}")
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        assert_eq!(
            endpoint("http://ecdsa:5001/", "/verify"),
            "http://ecdsa:5001/verify"
        );
        assert_eq!(
            endpoint("http://szsstark:5002", "verify_proof"),
            "http://szsstark:5002/verify_proof"
        );
    }

    #[test]
    fn request_payloads_use_service_field_names() {
        let sig = serde_json::to_value(SignatureRequest {
            signed_data: "ab12",
            original_data: "4",
            public_key: "cd34",
        })
        .unwrap();
        assert_eq!(
            sig,
            json!({"signed_data": "ab12", "original_data": "4", "public_key": "cd34"})
        );

        let proof_data = json!({"proof_id": "STARK-PROOF-1", "valid": true});
        let proof = serde_json::to_value(ProofRequest {
            proof_data: &proof_data,
            original_data: "4",
        })
        .unwrap();
        assert_eq!(proof["proof_data"]["valid"], json!(true));
        assert_eq!(proof["original_data"], json!("4"));
    }

    #[test]
    fn verify_response_can_be_deserialized() {
        let resp: VerifyResponse = serde_json::from_str(r#"{"is_valid": true}"#).unwrap();
        assert_eq!(resp.is_valid, Some(true));

        let resp: VerifyResponse = serde_json::from_str(r#"{"error": "Missing data"}"#).unwrap();
        assert_eq!(resp.is_valid, None);
    }

    #[test]
    fn unreachable_service_reports_unreachable() {
        // Nothing listens on port 1; the connection is refused or times out.
        let client = HttpVerificationClient::new(
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
            Duration::from_millis(500),
        )
        .expect("client should build");

        assert_eq!(
            client.verify_signature("ab12", "4", "cd34"),
            VerificationResult::Unreachable
        );
        assert_eq!(
            client.verify_proof(&json!({"valid": true}), "4"),
            VerificationResult::Unreachable
        );
    }

    #[test]
    fn stalled_response_body_reports_unreachable() {
        // Promises 20 bytes, sends 7, then goes quiet.
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 20\r\n\r\n{\"is_va",
            Duration::from_secs(3),
        );
        let client = HttpVerificationClient::new(&url, &url, Duration::from_millis(500))
            .expect("client should build");

        assert_eq!(
            client.verify_signature("ab12", "4", "cd34"),
            VerificationResult::Unreachable
        );
    }

    #[test]
    fn undecodable_response_body_is_invalid() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
            Duration::ZERO,
        );
        let client = HttpVerificationClient::new(&url, &url, Duration::from_secs(2))
            .expect("client should build");

        let err = client
            .request_signature_verdict("ab12", "4", "cd34")
            .unwrap_err();
        assert!(matches!(err, VerifyError::Protocol(_)), "got {err:?}");
        assert_eq!(err.as_result(), VerificationResult::Invalid);
    }
}
