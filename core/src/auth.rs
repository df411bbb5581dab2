//! Request authorization policies.
//!
//! # Design
//! The client never reads or caches credentials itself. Whether a request
//! needs an `Authorization` header, and what goes into it, is decided entirely
//! by the configured `RequestAuthorizer`. Token refresh belongs in the
//! authorizer (or the `TokenSource` behind `BearerAuthorizer`) as well.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::http::Header;
use crate::request::Endpoint;

/// Decides whether a request is authorized and produces its header.
#[async_trait]
pub trait RequestAuthorizer: Send + Sync {
    fn needs_authorization(&self, endpoint: &Endpoint) -> bool {
        endpoint.is_authorizable()
    }

    async fn authorization_header(&self, endpoint: &Endpoint) -> Result<Header, BoxError>;
}

/// Adds the same header to every authorizable request.
#[derive(Debug, Clone)]
pub struct StaticAuthorizer {
    header: Header,
}

impl StaticAuthorizer {
    pub fn new(header: Header) -> Self {
        Self { header }
    }
}

#[async_trait]
impl RequestAuthorizer for StaticAuthorizer {
    async fn authorization_header(&self, _endpoint: &Endpoint) -> Result<Header, BoxError> {
        Ok(self.header.clone())
    }
}

/// Source of bearer tokens. Implementations own acquisition and refresh.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, BoxError>;
}

/// Sends `Authorization: Bearer <token>` using a token from a `TokenSource`.
#[derive(Clone)]
pub struct BearerAuthorizer {
    source: Arc<dyn TokenSource>,
}

impl BearerAuthorizer {
    pub fn new(source: impl TokenSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }
}

#[async_trait]
impl RequestAuthorizer for BearerAuthorizer {
    async fn authorization_header(&self, endpoint: &Endpoint) -> Result<Header, BoxError> {
        let token = self.source.token().await?;
        tracing::debug!(path = endpoint.path(), "attaching bearer token");
        Ok(Header::new("Authorization", format!("Bearer {token}")))
    }
}
