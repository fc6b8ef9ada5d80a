//! HTTP value types shared by the dispatcher and its transport.
//!
//! # Design
//! Requests and responses are plain data. `Dispatcher::prepare` produces a
//! `RequestDescriptor` without touching the network, a `Transport` turns it
//! into an `HttpResponse`, and `interpret` maps that response onto the
//! caller-facing `Reply`. Headers stay as ordered `(name, value)` pairs so the
//! first-wins normalization order is observable.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::proxy::ProxyAgent;

/// The verbs the dispatcher accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Head,
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Only update verbs write their body to the wire.
    pub fn is_update(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    /// Case-sensitive: `"get"` is not a valid method.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HEAD" => Ok(HttpMethod::Head),
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(()),
        }
    }
}

/// Transport scheme of a target URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn from_url(url: &Url) -> Option<Self> {
        match url.scheme() {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }
}

/// A fully validated request, ready for a `Transport`.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub proxy: Option<ProxyAgent>,
}

impl RequestDescriptor {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The bytes actually written after the request head. `None` for
    /// HEAD/GET/DELETE even when a body was supplied.
    pub fn payload(&self) -> Option<&str> {
        if self.method.is_update() {
            self.body.as_deref()
        } else {
            None
        }
    }

    /// Headers as they go out on the wire. A `content-length` computed for a
    /// body that is not transmitted is left out so the message stays framed.
    pub fn wire_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        let drop_length = self.body.is_some() && self.payload().is_none();
        self.headers
            .iter()
            .filter(move |(key, _)| !(drop_length && key == "content-length"))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// A buffered response as produced by a `Transport`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_message: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn into_parts(self) -> (ResponseHead, String) {
        let head = ResponseHead {
            status: self.status,
            status_message: self.status_message,
            headers: self.headers,
        };
        (head, self.body)
    }
}

/// Response metadata handed to the caller unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub status_message: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response body, decoded when the `json` option asked for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(serde_json::Value),
}

impl Body {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            Body::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Text(_) => None,
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub head: ResponseHead,
    pub body: Body,
}
