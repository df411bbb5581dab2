//! Error types for the request pipeline.
//!
//! # Design
//! `ClientError` covers every failure the pipeline itself can produce and is
//! independent of the caller's types, so validators and 2FA handlers can hand
//! one back. `ExecuteError` adds the decoded API error on top: when the
//! server's error body decodes cleanly, callers get their own type back in
//! `ExecuteError::Api` and can match on it.

use thiserror::Error;

/// Boxed error used where the pipeline forwards errors it does not own.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised while moving bytes over the network.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    /// The TLS handshake failed, including a rejected trust evaluation.
    #[error("TLS handshake failed: {0}")]
    Tls(#[source] BoxError),

    #[error("transport failure: {0}")]
    Other(#[source] BoxError),
}

/// Errors produced by the pipeline, independent of the caller's result types.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The descriptor path could not be resolved against the base URL.
    #[error("cannot resolve path {path:?} against base URL {base_url:?}")]
    UrlConstruction { path: String, base_url: String },

    /// Raised by the configured authorizer, forwarded as is.
    #[error(transparent)]
    Authorization(BoxError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response content type matches none of the accepted MIME types.
    #[error("unacceptable content type: expected {expected}, received {received}")]
    UnacceptableContentType { expected: String, received: String },

    /// A two-factor challenge was cancelled by its handler.
    #[error("two-factor challenge cancelled")]
    Cancelled,

    #[error("failed to encode request body: {0}")]
    Encode(#[source] BoxError),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] BoxError),

    /// Any other error handed to the pipeline by a validator or a 2FA handler.
    #[error(transparent)]
    Custom(BoxError),
}

impl ClientError {
    pub fn custom(error: impl Into<BoxError>) -> Self {
        ClientError::Custom(error.into())
    }
}

/// Error returned by `Client::execute`.
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// The server answered with an error body that decoded into `E`.
    #[error("server returned an error response: {0:?}")]
    Api(E),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl<E> ExecuteError<E> {
    pub fn api(&self) -> Option<&E> {
        match self {
            ExecuteError::Api(e) => Some(e),
            ExecuteError::Client(_) => None,
        }
    }

    pub fn client(&self) -> Option<&ClientError> {
        match self {
            ExecuteError::Api(_) => None,
            ExecuteError::Client(e) => Some(e),
        }
    }
}
