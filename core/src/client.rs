//! The request execution pipeline.
//!
//! # Design
//! `Client` holds read-only configuration plus a `Transport` and carries no
//! mutable state between calls, so one instance can serve any number of
//! concurrent executions. Like the request/response split in the rest of the
//! crate, the pipeline has a pure `build_request` half and a pure
//! `parse_response` half; `execute` strings them together with authorization,
//! the network round-trip and the optional step-up challenge:
//!
//! 1. resolve the path against the base URL and build the `WireRequest`;
//! 2. attach the authorizer's header unless the request opted out;
//! 3. send it;
//! 4. if a 2FA handler is installed and wants step-up, suspend on a
//!    `TwoFactorChallenge` and carry on with the response it resolves to;
//! 5. validate and route the response to one of the converters.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::challenge::{TwoFactorChallenge, TwoFactorHandler};
use crate::config::ClientConfig;
use crate::error::{ClientError, ExecuteError};
use crate::http::{Response, WireRequest};
use crate::observe::RequestObserver;
use crate::request::{Endpoint, Request};
use crate::transport::{ReqwestTransport, Transport};
use crate::validate::Disposition;

/// Anything that can execute a request descriptor.
///
/// `Client` is the networked implementation; fixture-backed executors for
/// tests and offline demos implement the same trait.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute<T, E>(&self, request: Request<T, E>) -> Result<T, ExecuteError<E>>
    where
        T: Send + 'static,
        E: Send + 'static;
}

/// Executes request descriptors over a `Transport`.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// A client sending requests with `ReqwestTransport`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::from_config(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve `path` against the base URL using RFC 3986 reference
    /// resolution. Without a base URL, `path` must be absolute.
    pub fn resolve_url(&self, path: &str) -> Result<Url, ClientError> {
        let resolved = match self.config.base_url() {
            Some(base) => Url::parse(base).and_then(|base| base.join(path)),
            None => Url::parse(path),
        };
        resolved.map_err(|_| ClientError::UrlConstruction {
            path: path.to_string(),
            base_url: self.config.base_url().unwrap_or_default().to_string(),
        })
    }

    /// Build the wire request for `request`, without authorization.
    pub fn build_request<T, E>(&self, request: &Request<T, E>) -> Result<WireRequest, ClientError> {
        let url = self.resolve_url(request.endpoint().path())?;
        prepare(request, url.to_string())
    }

    /// Validate `response` and decode it with the converter its disposition
    /// selects.
    pub fn parse_response<T, E>(
        &self,
        request: &Request<T, E>,
        wire: &WireRequest,
        response: &Response,
    ) -> Result<T, ExecuteError<E>> {
        route(request, wire, response)
    }

    /// Run the whole pipeline for `request`.
    pub async fn execute<T, E>(&self, request: Request<T, E>) -> Result<T, ExecuteError<E>> {
        let mut wire = self.build_request(&request)?;
        self.authorize(request.endpoint(), &mut wire).await?;

        let mut response = self.send(&wire).await?;
        if let Some(handler) = self.config.two_factor_handler() {
            if handler.requires_step_up(&response) {
                response = self.step_up(handler, &wire, response).await?;
            }
        }

        self.parse_response(&request, &wire, &response)
    }

    async fn authorize(&self, endpoint: &Endpoint, wire: &mut WireRequest) -> Result<(), ClientError> {
        let Some(authorizer) = self.config.authorizer() else {
            return Ok(());
        };
        if !endpoint.is_authorizable() || !authorizer.needs_authorization(endpoint) {
            return Ok(());
        }
        let header = authorizer
            .authorization_header(endpoint)
            .await
            .map_err(ClientError::Authorization)?;
        wire.headers.insert(header);
        Ok(())
    }

    async fn send(&self, wire: &WireRequest) -> Result<Response, ClientError> {
        send_observed(self.transport.as_ref(), self.config.observer(), wire).await
    }

    async fn step_up(
        &self,
        handler: &dyn TwoFactorHandler,
        wire: &WireRequest,
        response: Response,
    ) -> Result<Response, ClientError> {
        tracing::debug!(
            status = response.status,
            url = %wire.url,
            "suspending request for two-factor authentication"
        );
        let (challenge, suspension) = TwoFactorChallenge::new(
            wire.clone(),
            response,
            self.transport.clone(),
            self.config.shared_observer(),
        );
        handler.handle(challenge);

        let resolved = suspension.resumed().await;
        match &resolved {
            Ok(response) => tracing::debug!(status = response.status, "two-factor challenge completed"),
            Err(error) => tracing::debug!(%error, "two-factor challenge failed"),
        }
        resolved
    }
}

/// Send `wire` over `transport`, reporting the exchange to `observer`.
///
/// Every request the pipeline puts on the wire goes through here, including
/// the re-sends of a two-factor challenge.
pub(crate) async fn send_observed(
    transport: &dyn Transport,
    observer: &dyn RequestObserver,
    wire: &WireRequest,
) -> Result<Response, ClientError> {
    observer.will_send(wire);
    tracing::debug!(method = %wire.method, url = %wire.url, "sending request");

    match transport.send(wire).await {
        Ok(response) => {
            tracing::debug!(status = response.status, url = %response.url, "received response");
            observer.did_receive(wire, &response);
            Ok(response)
        }
        Err(error) => {
            let error = ClientError::from(error);
            tracing::debug!(url = %wire.url, %error, "request failed");
            observer.did_fail(wire, &error);
            Err(error)
        }
    }
}

/// Turn `request` into a wire request addressed to `url`: copies its headers,
/// falls back to the success converter's `Accept` hint and encodes the body.
pub(crate) fn prepare<T, E>(request: &Request<T, E>, url: String) -> Result<WireRequest, ClientError> {
    let endpoint = request.endpoint();
    let mut wire = WireRequest::new(endpoint.method(), url);

    for (name, value) in endpoint.headers().iter() {
        wire.headers.set(name, value);
    }
    if !wire.headers.contains("accept") {
        if let Some(accept) = request.success_converter().accept() {
            wire.headers.set("Accept", accept);
        }
    }
    if let Some(encoder) = endpoint.body() {
        let encoded = encoder.encode().map_err(ClientError::Encode)?;
        if !wire.headers.contains("content-type") {
            wire.headers.set("Content-Type", encoded.content_type);
        }
        wire.body = Some(encoded.bytes);
    }
    Ok(wire)
}

/// Validate `response` and act on the disposition.
pub(crate) fn route<T, E>(
    request: &Request<T, E>,
    wire: &WireRequest,
    response: &Response,
) -> Result<T, ExecuteError<E>> {
    match request.endpoint().validator().validate(wire, response) {
        Disposition::UseSuccessConverter => request
            .success_converter()
            .decode(&response.body)
            .map_err(|e| ClientError::Decode(e).into()),
        Disposition::UseErrorConverter => match request.error_converter().decode(&response.body) {
            Ok(api_error) => {
                tracing::debug!(status = response.status, url = %response.url, "decoded error response");
                Err(ExecuteError::Api(api_error))
            }
            Err(e) => Err(ClientError::Decode(e).into()),
        },
        Disposition::CompleteWithError(error) => Err(error.into()),
    }
}

#[async_trait]
impl Execute for Client {
    async fn execute<T, E>(&self, request: Request<T, E>) -> Result<T, ExecuteError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        Client::execute(self, request).await
    }
}
