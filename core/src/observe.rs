//! Request observation hooks.
//!
//! Observers see every exchange the client performs but cannot change it.
//! The default observer does nothing; `TracingObserver` mirrors each exchange
//! into `tracing` events at trace level.

use crate::error::ClientError;
use crate::http::{Response, WireRequest};

/// Callbacks around each request sent by `Client`.
pub trait RequestObserver: Send + Sync {
    fn will_send(&self, _request: &WireRequest) {}

    fn did_receive(&self, _request: &WireRequest, _response: &Response) {}

    fn did_fail(&self, _request: &WireRequest, _error: &ClientError) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RequestObserver for NoopObserver {}

/// Emits a trace event for every request, response and failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn will_send(&self, request: &WireRequest) {
        tracing::trace!(
            method = %request.method,
            url = %request.url,
            headers = request.headers.len(),
            body_bytes = request.body.as_ref().map_or(0, Vec::len),
            "request"
        );
    }

    fn did_receive(&self, request: &WireRequest, response: &Response) {
        tracing::trace!(
            method = %request.method,
            url = %response.url,
            status = response.status,
            body_bytes = response.body.len(),
            "response"
        );
    }

    fn did_fail(&self, request: &WireRequest, error: &ClientError) {
        tracing::trace!(method = %request.method, url = %request.url, %error, "request failed");
    }
}
