//! Converter contracts between typed values and body bytes.
//!
//! The pipeline only needs the two narrow traits below. The JSON and string
//! adapters cover the common cases; anything fancier (property lists, images,
//! multipart) implements the same traits outside this crate.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::BoxError;

/// Decodes a response body into a typed value.
pub trait ResponseConverter: Send + Sync {
    type Output;

    /// MIME type this converter expects, used as the default `Accept` header.
    fn accept(&self) -> Option<&str> {
        None
    }

    fn decode(&self, body: &[u8]) -> Result<Self::Output, BoxError>;
}

/// Encoded request body and the content type to send it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Encodes a value into request body bytes.
pub trait BodyEncoder: Send + Sync {
    fn encode(&self) -> Result<EncodedBody, BoxError>;
}

/// Decodes JSON bodies with serde.
pub struct JsonConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonConverter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ResponseConverter for JsonConverter<T> {
    type Output = T;

    fn accept(&self) -> Option<&str> {
        Some("application/json")
    }

    fn decode(&self, body: &[u8]) -> Result<T, BoxError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Decodes bodies as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl ResponseConverter for StringConverter {
    type Output = String;

    fn decode(&self, body: &[u8]) -> Result<String, BoxError> {
        Ok(String::from_utf8(body.to_vec())?)
    }
}

/// Serializes a value as a JSON request body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T: Serialize + Send + Sync> BodyEncoder for JsonBody<T> {
    fn encode(&self) -> Result<EncodedBody, BoxError> {
        Ok(EncodedBody {
            bytes: serde_json::to_vec(&self.0)?,
            content_type: "application/json".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct User {
        id: u64,
    }

    #[test]
    fn json_converter_decodes_and_advertises_json() {
        let converter = JsonConverter::<User>::new();
        assert_eq!(converter.accept(), Some("application/json"));
        assert_eq!(converter.decode(br#"{"id":42}"#).unwrap(), User { id: 42 });
    }

    #[test]
    fn json_converter_reports_bad_bodies() {
        assert!(JsonConverter::<User>::new().decode(b"not json").is_err());
    }

    #[test]
    fn string_converter_rejects_invalid_utf8() {
        assert_eq!(StringConverter.decode(b"hello").unwrap(), "hello");
        assert!(StringConverter.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn json_body_sets_content_type() {
        let body = JsonBody(User { id: 7 }).encode().unwrap();
        assert_eq!(body.content_type, "application/json");
        let value: serde_json::Value = serde_json::from_slice(&body.bytes).unwrap();
        assert_eq!(value["id"], 7);
    }
}
