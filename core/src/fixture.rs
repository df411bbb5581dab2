//! Offline execution from canned responses.
//!
//! `FixtureExecutor` implements `Execute` without a network. Responses are
//! registered per method and path; executing a request prepares it exactly as
//! `Client` would (headers, `Accept` hint, body encoding) and then runs the
//! request's validator and converters over the canned response. Authorization
//! and step-up challenges are skipped since nothing goes over the wire.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::client::{prepare, route, Execute};
use crate::error::{ClientError, ExecuteError, TransportError};
use crate::http::{HttpMethod, Response, WireRequest};
use crate::request::Request;

/// No response was registered for the request.
#[derive(Debug, Error)]
#[error("no fixture for {method} {path}")]
pub struct MissingFixture {
    pub method: HttpMethod,
    pub path: String,
}

#[derive(Debug, Default)]
pub struct FixtureExecutor {
    fixtures: HashMap<(HttpMethod, String), Response>,
    served: Mutex<Vec<WireRequest>>,
}

impl FixtureExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: HttpMethod, path: impl Into<String>, response: Response) -> Self {
        self.insert(method, path, response);
        self
    }

    /// Register `response` for `method` and `path`, replacing any earlier one.
    pub fn insert(&mut self, method: HttpMethod, path: impl Into<String>, response: Response) {
        self.fixtures.insert((method, path.into()), response);
    }

    /// Every request executed so far, in order.
    pub async fn requests(&self) -> Vec<WireRequest> {
        self.served.lock().await.clone()
    }
}

#[async_trait]
impl Execute for FixtureExecutor {
    async fn execute<T, E>(&self, request: Request<T, E>) -> Result<T, ExecuteError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let endpoint = request.endpoint();
        let wire = prepare(&request, endpoint.path().to_string())?;
        self.served.lock().await.push(wire.clone());

        let key = (endpoint.method(), endpoint.path().to_string());
        let Some(response) = self.fixtures.get(&key) else {
            let missing = MissingFixture {
                method: key.0,
                path: key.1,
            };
            tracing::debug!(%missing, "fixture lookup failed");
            return Err(ClientError::from(TransportError::Other(Box::new(missing))).into());
        };
        tracing::debug!(method = %wire.method, path = %wire.url, status = response.status, "replaying fixture");
        route(&request, &wire, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::JsonBody;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct ApiMessage {
        message: String,
    }

    fn json(status: u16, body: &str) -> Response {
        Response::new("fixture:users/42", status)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    fn executor() -> FixtureExecutor {
        FixtureExecutor::new()
            .with(HttpMethod::Get, "users/42", json(200, r#"{"id":42}"#))
            .with(HttpMethod::Delete, "users/42", json(403, r#"{"message":"forbidden"}"#))
            .with(
                HttpMethod::Get,
                "users/42/avatar",
                Response::new("fixture:avatar", 200).with_header("Content-Type", "application/octet-stream"),
            )
    }

    #[tokio::test]
    async fn replays_success_fixture() {
        let executor = executor();
        let user = executor
            .execute(Request::<User, ApiMessage>::get("users/42"))
            .await
            .unwrap();
        assert_eq!(user, User { id: 42 });

        let served = executor.requests().await;
        assert_eq!(served.len(), 1);
        assert_eq!(served[0].headers.get("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn replays_error_fixture_as_api_error() {
        let err = executor()
            .execute(Request::<User, ApiMessage>::delete("users/42"))
            .await
            .unwrap_err();
        assert_eq!(err.api().map(|m| m.message.as_str()), Some("forbidden"));
    }

    #[tokio::test]
    async fn fixtures_are_validated_like_live_responses() {
        let err = executor()
            .execute(Request::<User, ApiMessage>::get("users/42/avatar"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::Client(ClientError::UnacceptableContentType { .. })
        ));
    }

    #[tokio::test]
    async fn missing_fixture_is_a_transport_error() {
        let err = executor()
            .execute(Request::<User, ApiMessage>::post("users").body(JsonBody(serde_json::json!({"name": "x"}))))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::Client(ClientError::Transport(TransportError::Other(_)))
        ));
        assert_eq!(err.to_string(), "transport failure: no fixture for POST users");
    }
}
