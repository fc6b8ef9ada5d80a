//! Caller-supplied inputs: the endpoint and per-request options.
//!
//! # Design
//! `RequestOptions` mirrors the loose option bag callers hand to the
//! dispatcher, so it deserializes from JSON as well as being built in code.
//! The method stays a string until `Dispatcher::prepare` validates it; an
//! unsupported verb is a reportable outcome, not a type error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Target of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Url(Url),
    Str(String),
    /// A structured value that is neither missing nor a string.
    Other(Value),
    Missing,
}

impl Endpoint {
    pub fn is_missing(&self) -> bool {
        match self {
            Endpoint::Missing => true,
            Endpoint::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<Url> for Endpoint {
    fn from(url: Url) -> Self {
        Endpoint::Url(url)
    }
}

impl From<&Url> for Endpoint {
    fn from(url: &Url) -> Self {
        Endpoint::Url(url.clone())
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Endpoint::Str(s)
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Endpoint::Str(s.to_string())
    }
}

impl<T: Into<Endpoint>> From<Option<T>> for Endpoint {
    fn from(endpoint: Option<T>) -> Self {
        endpoint.map_or(Endpoint::Missing, Into::into)
    }
}

impl From<Value> for Endpoint {
    /// Falsy values (null, false, 0, "") count as missing.
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Endpoint::Missing,
            Value::Number(ref n) if n.as_f64() == Some(0.0) => Endpoint::Missing,
            Value::String(s) => Endpoint::Str(s),
            other => Endpoint::Other(other),
        }
    }
}

/// Request payload: raw text, or a value to be JSON-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Json(Value),
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Text(s)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Text(s.to_string())
    }
}

/// A JSON string is sent as-is, not quoted.
impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RequestBody::Text(s),
            other => RequestBody::Json(other),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Defaults to GET when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, with = "crate::headers::ordered")]
    pub headers: Vec<(String, String)>,
    /// Decode a non-empty response body as JSON.
    #[serde(default)]
    pub json: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values_are_missing_endpoints() {
        for value in [Value::Null, json!(false), json!(0), json!("")] {
            assert!(Endpoint::from(value.clone()).is_missing(), "{value}");
        }
        assert!(Endpoint::from(None::<&str>).is_missing());
    }

    #[test]
    fn structured_endpoint_is_other() {
        let endpoint = Endpoint::from(json!({"host": "example.com"}));
        assert!(matches!(endpoint, Endpoint::Other(_)));
        assert!(!endpoint.is_missing());
    }

    #[test]
    fn string_values_are_text_bodies() {
        let opts = RequestOptions::new().body(json!("x"));
        assert_eq!(opts.body, Some(RequestBody::Text("x".to_string())));
        let opts = RequestOptions::new().body(json!(["x"]));
        assert_eq!(opts.body, Some(RequestBody::Json(json!(["x"]))));
    }

    #[test]
    fn options_deserialize_from_json() {
        let opts: RequestOptions = serde_json::from_str(
            r#"{"method":"PUT","headers":{"X-A":"1","Accept":"text/plain"},"json":true,"body":{"k":[1,2]}}"#,
        )
        .unwrap();
        assert_eq!(opts.method.as_deref(), Some("PUT"));
        assert_eq!(
            opts.headers,
            vec![
                ("X-A".to_string(), "1".to_string()),
                ("Accept".to_string(), "text/plain".to_string()),
            ]
        );
        assert!(opts.json);
        assert_eq!(opts.body, Some(RequestBody::Json(json!({"k": [1, 2]}))));
    }

    #[test]
    fn string_body_deserializes_as_text() {
        let opts: RequestOptions = serde_json::from_str(r#"{"body":"raw"}"#).unwrap();
        assert_eq!(opts.body, Some(RequestBody::Text("raw".to_string())));
    }

    #[test]
    fn non_object_headers_deserialize_empty() {
        let opts: RequestOptions = serde_json::from_str(r#"{"headers":"nope"}"#).unwrap();
        assert!(opts.headers.is_empty());
        assert!(opts.method.is_none());
        assert!(!opts.json);
    }

    #[test]
    fn builder_accumulates_fields() {
        let opts = RequestOptions::new()
            .method("POST")
            .header("X-One", "1")
            .json(true)
            .body(json!({"a": 1}));
        assert_eq!(opts.method.as_deref(), Some("POST"));
        assert_eq!(opts.headers.len(), 1);
        assert!(matches!(opts.body, Some(RequestBody::Json(_))));
    }
}
