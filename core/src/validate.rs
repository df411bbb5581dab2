//! Response validation and the three-way disposition it produces.
//!
//! # Design
//! A validator looks at the finished exchange and decides exactly one of three
//! things: decode the body with the success converter, decode it with the
//! error converter, or fail with an error and decode nothing. There is no
//! fourth outcome.
//!
//! The default validator checks the status code first and then lets a
//! content-type mismatch override it, so a `200` carrying a body the caller
//! never asked for still fails.

use std::ops::RangeInclusive;

use crate::error::ClientError;
use crate::http::{Response, WireRequest};
use crate::mime::MimeType;

/// What the pipeline does with a validated response.
#[derive(Debug)]
pub enum Disposition {
    UseSuccessConverter,
    UseErrorConverter,
    CompleteWithError(ClientError),
}

/// Inspects a response and decides its disposition.
pub trait ResponseValidator: Send + Sync {
    fn validate(&self, request: &WireRequest, response: &Response) -> Disposition;
}

/// Status code + content type validator used when a request names no other.
#[derive(Debug, Clone)]
pub struct StatusCodeValidator {
    accepted: Vec<RangeInclusive<u16>>,
}

impl StatusCodeValidator {
    pub fn new() -> Self {
        Self {
            accepted: vec![200..=299],
        }
    }

    /// Replace the accepted status codes.
    pub fn accepting(ranges: impl IntoIterator<Item = RangeInclusive<u16>>) -> Self {
        Self {
            accepted: ranges.into_iter().collect(),
        }
    }

    fn accepts(&self, status: u16) -> bool {
        self.accepted.iter().any(|range| range.contains(&status))
    }
}

impl Default for StatusCodeValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseValidator for StatusCodeValidator {
    fn validate(&self, request: &WireRequest, response: &Response) -> Disposition {
        let status_disposition = if self.accepts(response.status) {
            Disposition::UseSuccessConverter
        } else {
            Disposition::UseErrorConverter
        };

        let received = response.content_type().and_then(MimeType::parse);
        let accepted = request
            .headers
            .get("accept")
            .map(MimeType::parse_list)
            .unwrap_or_default();

        let Some(received) = received else {
            return status_disposition;
        };
        if accepted.is_empty() || accepted.iter().any(|mime| mime.matches(&received)) {
            return status_disposition;
        }

        let expected = accepted
            .iter()
            .map(MimeType::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!(
            url = %response.url,
            status = response.status,
            %expected,
            %received,
            "response content type not accepted"
        );
        Disposition::CompleteWithError(ClientError::UnacceptableContentType {
            expected,
            received: received.to_string(),
        })
    }
}
