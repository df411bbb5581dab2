//! The network seam of the pipeline.
//!
//! # Design
//! `Client` never talks to a socket directly; it hands a `WireRequest` to a
//! `Transport` and gets a `Response` back. Non-2xx statuses are data here, not
//! errors. Only failures to complete the exchange (connect, TLS, timeout)
//! become `TransportError`s.
//!
//! `ReqwestTransport` is the default. When trust policies are configured it
//! runs rustls with `TrustEvaluator` as the certificate verifier.

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{Headers, Response, WireRequest};
use crate::trust::TrustEvaluator;

/// Sends one request and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &WireRequest) -> Result<Response, TransportError>;
}

/// `Transport` backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a transport honouring the timeout, user agent and trust policies
    /// of `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = config.user_agent() {
            builder = builder.user_agent(user_agent);
        }
        if !config.trust_policies().is_empty() {
            let tls = TrustEvaluator::new(config.trust_policies().clone())
                .and_then(TrustEvaluator::into_client_config)
                .map_err(|e| TransportError::Tls(Box::new(e)))?;
            builder = builder.use_preconfigured_tls(tls);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Other(Box::new(e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &WireRequest) -> Result<Response, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Other(Box::new(e)))?;
        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let url = response.url().to_string();
        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(Response {
            url,
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if is_tls_failure(&error) {
        TransportError::Tls(Box::new(error))
    } else if error.is_connect() {
        TransportError::Connect(Box::new(error))
    } else {
        TransportError::Other(Box::new(error))
    }
}

fn is_tls_failure(error: &reqwest::Error) -> bool {
    std::error::Error::source(error).is_some_and(chain_has_rustls_error)
}

/// rustls errors reach us wrapped in one or more `io::Error` layers, and
/// `io::Error::source()` skips the wrapped error, so each io layer is
/// unwrapped with `get_ref()` before following `source()`.
fn chain_has_rustls_error(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.is::<rustls::Error>() {
            return true;
        }
        if let Some(inner) = err
            .downcast_ref::<std::io::Error>()
            .and_then(std::io::Error::get_ref)
        {
            if chain_has_rustls_error(inner) {
                return true;
            }
        }
        current = std::error::Error::source(err);
    }
    false
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Plays back queued results and records every request it sees.
    pub(crate) struct ScriptedTransport {
        results: Mutex<VecDeque<Result<Response, TransportError>>>,
        requests: Mutex<Vec<WireRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: impl IntoIterator<Item = Response>) -> Arc<Self> {
            Self::with_results(responses.into_iter().map(Ok))
        }

        pub(crate) fn with_results(
            results: impl IntoIterator<Item = Result<Response, TransportError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn requests(&self) -> Vec<WireRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &WireRequest) -> Result<Response, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted response left".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::trust::{TrustAll, TrustPolicies, WILDCARD_HOST};
    use std::time::Duration;

    #[test]
    fn builds_with_default_tls() {
        let config = ClientConfig::builder().timeout(Duration::from_secs(5)).build();
        assert!(ReqwestTransport::from_config(&config).is_ok());
    }

    #[test]
    fn builds_with_trust_policies() {
        let config = ClientConfig::builder()
            .user_agent("courier-tests")
            .trust_policies(TrustPolicies::new().with(WILDCARD_HOST, TrustAll))
            .build();
        assert!(ReqwestTransport::from_config(&config).is_ok());
    }

    fn wrapped(kind: std::io::ErrorKind, inner: impl Into<BoxError>) -> std::io::Error {
        std::io::Error::new(kind, inner)
    }

    #[test]
    fn finds_rustls_error_under_nested_io_errors() {
        let rejected = rustls::Error::InvalidCertificate(rustls::CertificateError::ApplicationVerificationFailure);
        let once = wrapped(std::io::ErrorKind::InvalidData, rejected.clone());
        assert!(chain_has_rustls_error(&once));

        let twice = wrapped(std::io::ErrorKind::Other, wrapped(std::io::ErrorKind::InvalidData, rejected));
        assert!(chain_has_rustls_error(&twice));
    }

    #[test]
    fn plain_io_errors_are_not_tls_failures() {
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert!(!chain_has_rustls_error(&refused));

        let nested = wrapped(std::io::ErrorKind::Other, wrapped(std::io::ErrorKind::InvalidData, "bad frame"));
        assert!(!chain_has_rustls_error(&nested));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::from_config(&ClientConfig::default()).unwrap();
        let request = WireRequest::new(crate::http::HttpMethod::Get, format!("http://{addr}/"));
        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
