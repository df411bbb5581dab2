//! Check URL resolution and response validation against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file lists named cases with their inputs and the expected
//! outcome, so the same tables can drive other client implementations.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    Client, ClientConfig, ClientError, Disposition, HttpMethod, Response, ResponseValidator,
    StatusCodeValidator, Transport, TransportError, WireRequest,
};

/// Never called; URL resolution and validation do no IO.
struct NoTransport;

#[async_trait]
impl Transport for NoTransport {
    async fn send(&self, _request: &WireRequest) -> Result<Response, TransportError> {
        Err(TransportError::Other("no transport in test vectors".into()))
    }
}

fn load(raw: &str) -> Vec<serde_json::Value> {
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// URL resolution
// ---------------------------------------------------------------------------

#[test]
fn resolve_test_vectors() {
    for case in load(include_str!("../../test-vectors/resolve.json")) {
        let name = case["name"].as_str().unwrap();
        let path = case["path"].as_str().unwrap();

        let mut builder = ClientConfig::builder();
        if let Some(base) = case["base_url"].as_str() {
            builder = builder.base_url(base);
        }
        let client = Client::with_transport(builder.build(), Arc::new(NoTransport));

        match (client.resolve_url(path), case["expected"].as_str()) {
            (Ok(url), Some(expected)) => assert_eq!(url.as_str(), expected, "{name}"),
            (Err(ClientError::UrlConstruction { path: reported, .. }), None) => {
                assert_eq!(reported, path, "{name}")
            }
            (other, expected) => panic!("{name}: got {other:?}, expected {expected:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn validate_test_vectors() {
    let url = "https://api.example.com/v1/users/42";
    let validator = StatusCodeValidator::new();

    for case in load(include_str!("../../test-vectors/validate.json")) {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;

        let mut request = WireRequest::new(HttpMethod::Get, url);
        if let Some(accept) = case["accept"].as_str() {
            request.headers.set("Accept", accept);
        }
        let mut response = Response::new(url, status);
        if let Some(content_type) = case["content_type"].as_str() {
            response.headers.set("Content-Type", content_type);
        }

        let disposition = validator.validate(&request, &response);
        match (case["expected"].as_str().unwrap(), disposition) {
            ("success", Disposition::UseSuccessConverter) => {}
            ("error", Disposition::UseErrorConverter) => {}
            (
                "unacceptable",
                Disposition::CompleteWithError(ClientError::UnacceptableContentType {
                    expected,
                    received,
                }),
            ) => {
                assert_eq!(expected, case["expected_types"].as_str().unwrap(), "{name}");
                assert_eq!(received, case["received_type"].as_str().unwrap(), "{name}");
            }
            (expected, other) => panic!("{name}: expected {expected}, got {other:?}"),
        }
    }
}
