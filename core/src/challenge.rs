//! Two-factor (step-up) authentication challenges.
//!
//! # Design
//! When the installed `TwoFactorHandler` says a response needs step-up
//! authentication, the client wraps the exchange in a `TwoFactorChallenge`,
//! hands it to the handler and suspends on a one-shot channel until the
//! challenge is resolved.
//!
//! The handler may `refresh` or `authenticate` as often as it likes; each call
//! re-sends the original request and replaces the held response. Resolving the
//! challenge (`complete`, `complete_with_error`, `cancel`) consumes it, so a
//! challenge resumes the pipeline at most once. Dropping an unresolved
//! challenge resumes the pipeline with `ClientError::Cancelled`.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::client::send_observed;
use crate::convert::ResponseConverter;
use crate::error::{BoxError, ClientError};
use crate::http::{Header, Response, WireRequest};
use crate::observe::RequestObserver;
use crate::transport::Transport;

/// Decides when step-up authentication is needed and resolves challenges.
pub trait TwoFactorHandler: Send + Sync {
    /// Whether `response` asks for step-up authentication.
    fn requires_step_up(&self, response: &Response) -> bool;

    /// Take over a challenge. Called once per challenge; the handler resolves
    /// it whenever it is ready, typically from a spawned task.
    fn handle(&self, challenge: TwoFactorChallenge);
}

type Resolution = Result<Response, ClientError>;

/// A suspended request waiting for step-up authentication.
pub struct TwoFactorChallenge {
    request: WireRequest,
    response: Response,
    transport: Arc<dyn Transport>,
    observer: Arc<dyn RequestObserver>,
    resume: oneshot::Sender<Resolution>,
}

/// The pipeline's end of a challenge.
pub(crate) struct Suspension {
    receiver: oneshot::Receiver<Resolution>,
}

impl Suspension {
    pub(crate) async fn resumed(self) -> Resolution {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(ClientError::Cancelled))
    }
}

impl TwoFactorChallenge {
    pub(crate) fn new(
        request: WireRequest,
        response: Response,
        transport: Arc<dyn Transport>,
        observer: Arc<dyn RequestObserver>,
    ) -> (Self, Suspension) {
        let (resume, receiver) = oneshot::channel();
        let challenge = Self {
            request,
            response,
            transport,
            observer,
            resume,
        };
        (challenge, Suspension { receiver })
    }

    pub fn status_code(&self) -> u16 {
        self.response.status
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn request(&self) -> &WireRequest {
        &self.request
    }

    /// Decode the held response body. Decoding errors go to the caller, the
    /// pipeline is not affected.
    pub fn decode<C>(&self, converter: &C) -> Result<C::Output, BoxError>
    where
        C: ResponseConverter + ?Sized,
    {
        converter.decode(&self.response.body)
    }

    /// Re-send the original request unchanged and hold the new response.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        tracing::debug!(url = %self.request.url, "refreshing two-factor challenge");
        self.resend().await
    }

    /// Add `header` to the original request, re-send it and hold the new
    /// response. The header stays on the request for later refreshes.
    pub async fn authenticate(&mut self, header: Header) -> Result<(), ClientError> {
        tracing::debug!(
            url = %self.request.url,
            header = %header.name,
            "authenticating two-factor challenge"
        );
        self.request.headers.insert(header);
        self.resend().await
    }

    async fn resend(&mut self) -> Result<(), ClientError> {
        self.response =
            send_observed(self.transport.as_ref(), self.observer.as_ref(), &self.request).await?;
        Ok(())
    }

    /// Resume the pipeline with `ClientError::Cancelled`.
    pub fn cancel(self) {
        tracing::warn!(url = %self.request.url, "two-factor challenge cancelled");
        resume(self.resume, Err(ClientError::Cancelled));
    }

    /// Resume the pipeline with the currently held response.
    pub fn complete(self) {
        resume(self.resume, Ok(self.response));
    }

    /// Resume the pipeline with `error`, as if validation had produced it.
    pub fn complete_with_error(self, error: ClientError) {
        resume(self.resume, Err(error));
    }
}

fn resume(sender: oneshot::Sender<Resolution>, resolution: Resolution) {
    if sender.send(resolution).is_err() {
        tracing::debug!("request no longer waiting on two-factor challenge");
    }
}

impl fmt::Debug for TwoFactorChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoFactorChallenge")
            .field("request", &self.request)
            .field("status", &self.response.status)
            .finish_non_exhaustive()
    }
}
