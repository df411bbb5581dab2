//! Request descriptors: what to call and how to read the answer.
//!
//! # Design
//! A `Request<T, E>` is immutable once built and consumed by a single
//! execution. The untyped half (`Endpoint`) is what policies such as the
//! authorizer see; the typed half is the pair of converters the pipeline
//! routes the response body to.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::convert::{BodyEncoder, JsonConverter, ResponseConverter};
use crate::http::{Header, Headers, HttpMethod};
use crate::validate::{ResponseValidator, StatusCodeValidator};

/// The untyped part of a request descriptor.
#[derive(Clone)]
pub struct Endpoint {
    method: HttpMethod,
    path: String,
    headers: Headers,
    body: Option<Arc<dyn BodyEncoder>>,
    validator: Arc<dyn ResponseValidator>,
    authorizable: bool,
}

impl Endpoint {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&dyn BodyEncoder> {
        self.body.as_deref()
    }

    pub fn validator(&self) -> &dyn ResponseValidator {
        self.validator.as_ref()
    }

    /// `false` when the request opted out of authorization.
    pub fn is_authorizable(&self) -> bool {
        self.authorizable
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .field("authorizable", &self.authorizable)
            .finish()
    }
}

/// Describes one logical HTTP call returning `T` on success and `E` when the
/// server answers with an error body.
pub struct Request<T, E> {
    endpoint: Endpoint,
    success: Arc<dyn ResponseConverter<Output = T>>,
    error: Arc<dyn ResponseConverter<Output = E>>,
}

impl<T, E> Request<T, E> {
    pub fn new<S, F>(method: HttpMethod, path: impl Into<String>, success: S, error: F) -> Self
    where
        S: ResponseConverter<Output = T> + 'static,
        F: ResponseConverter<Output = E> + 'static,
    {
        Self {
            endpoint: Endpoint {
                method,
                path: path.into(),
                headers: Headers::new(),
                body: None,
                validator: Arc::new(StatusCodeValidator::new()),
                authorizable: true,
            },
            success: Arc::new(success),
            error: Arc::new(error),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.endpoint.headers.set(name, value);
        self
    }

    pub fn with_header(self, header: Header) -> Self {
        self.header(header.name, header.value)
    }

    pub fn body(mut self, body: impl BodyEncoder + 'static) -> Self {
        self.endpoint.body = Some(Arc::new(body));
        self
    }

    pub fn validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.endpoint.validator = Arc::new(validator);
        self
    }

    /// Send this request without asking the authorizer for a header.
    pub fn skip_authorization(mut self) -> Self {
        self.endpoint.authorizable = false;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn success_converter(&self) -> &dyn ResponseConverter<Output = T> {
        self.success.as_ref()
    }

    pub fn error_converter(&self) -> &dyn ResponseConverter<Output = E> {
        self.error.as_ref()
    }
}

impl<T: DeserializeOwned + 'static, E: DeserializeOwned + 'static> Request<T, E> {
    /// A request whose success and error bodies are both JSON.
    pub fn json(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::new(method, path, JsonConverter::<T>::new(), JsonConverter::<E>::new())
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::json(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::json(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::json(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::json(HttpMethod::Delete, path)
    }
}

impl<T, E> fmt::Debug for Request<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request").field("endpoint", &self.endpoint).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{JsonBody, StringConverter};

    #[test]
    fn defaults() {
        let request: Request<String, String> =
            Request::new(HttpMethod::Get, "users/42", StringConverter, StringConverter);
        let endpoint = request.endpoint();
        assert_eq!(endpoint.method(), HttpMethod::Get);
        assert_eq!(endpoint.path(), "users/42");
        assert!(endpoint.headers().is_empty());
        assert!(endpoint.body().is_none());
        assert!(endpoint.is_authorizable());
    }

    #[test]
    fn builder_methods_accumulate() {
        let request: Request<serde_json::Value, serde_json::Value> = Request::post("users")
            .header("X-Request-Id", "abc")
            .with_header(Header::new("x-request-id", "def"))
            .body(JsonBody(serde_json::json!({"name": "Ada"})))
            .skip_authorization();
        let endpoint = request.endpoint();
        assert_eq!(endpoint.method(), HttpMethod::Post);
        assert_eq!(endpoint.headers().get("X-Request-Id"), Some("def"));
        assert_eq!(endpoint.headers().len(), 1);
        assert!(endpoint.body().is_some());
        assert!(!endpoint.is_authorizable());
    }

    #[test]
    fn json_requests_advertise_json() {
        let request: Request<serde_json::Value, serde_json::Value> = Request::get("users/42");
        assert_eq!(request.success_converter().accept(), Some("application/json"));
    }
}
