//! Asynchronous HTTP request execution for typed API clients.
//!
//! # Overview
//! A `Request` describes one API call: method, path, headers, an optional
//! body, and the converters that turn the response into either a success
//! value or a typed API error. `Client` executes it. It resolves the path
//! against the configured base URL, authorizes the request, sends it,
//! optionally suspends it for step-up (two-factor) authentication, validates
//! the response and decodes it.
//!
//! # Design
//! - `Client` holds only immutable configuration and a `Transport`, so one
//!   instance can run any number of requests concurrently.
//! - Pluggable seams are traits: `RequestAuthorizer`, `ResponseValidator`,
//!   `ResponseConverter`, `TwoFactorHandler`, `TrustPolicy`, `Transport` and
//!   `RequestObserver`.
//! - Library failures are `ClientError`; decoded API errors come back as
//!   `ExecuteError::Api` so callers can match on their own error type.
//! - `Execute` is the caller-facing seam; `FixtureExecutor` implements it
//!   from canned responses for tests and offline use.
//! - TLS trust decisions are made per host by `TrustEvaluator`, which plugs
//!   into rustls as the certificate verifier.

pub mod auth;
pub mod challenge;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod fixture;
pub mod http;
pub mod mime;
pub mod observe;
pub mod request;
pub mod transport;
pub mod trust;
pub mod validate;

pub use auth::{BearerAuthorizer, RequestAuthorizer, StaticAuthorizer, TokenSource};
pub use challenge::{TwoFactorChallenge, TwoFactorHandler};
pub use client::{Client, Execute};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use convert::{BodyEncoder, EncodedBody, JsonBody, JsonConverter, ResponseConverter, StringConverter};
pub use error::{BoxError, ClientError, ExecuteError, TransportError};
pub use fixture::{FixtureExecutor, MissingFixture};
pub use http::{Header, Headers, HttpMethod, Response, WireRequest};
pub use mime::MimeType;
pub use observe::{NoopObserver, RequestObserver, TracingObserver};
pub use request::{Endpoint, Request};
pub use transport::{ReqwestTransport, Transport};
pub use trust::{
    PinnedCertificates, PinnedPublicKeys, SystemTrust, TrustAll, TrustError, TrustEvaluator, TrustPolicies,
    TrustPolicy, WILDCARD_HOST,
};
pub use validate::{Disposition, ResponseValidator, StatusCodeValidator};
