//! Error types for the request dispatcher.
//!
//! # Design
//! `MissingEndpoint` and `NoRuntime` are the only variants returned before a
//! request is started. Everything else ends up in the request's outcome. `Status` is the
//! one failure that still carries the response head and raw body, and `Json`
//! keeps the head of the response that failed to decode.

use std::error::Error as _;

use thiserror::Error;

use crate::http::ResponseHead;

/// Failure raised by a `Transport`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { message }
    }
}

/// Every way a request can fail.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Missing target endpoint")]
    MissingEndpoint,

    /// The callback API was used outside a tokio runtime.
    #[error("No tokio runtime available")]
    NoRuntime,

    /// The endpoint was neither a URL nor a string.
    #[error("Invalid URI {0}")]
    InvalidUri(String),

    #[error("Invalid Method {0}")]
    InvalidMethod(String),

    /// Carries the scheme with its trailing colon, e.g. `ftp:`.
    #[error("Invalid Protocol {0}")]
    InvalidProtocol(String),

    #[error(transparent)]
    UriParse(#[from] url::ParseError),

    #[error("Invalid Proxy {uri}: {source}")]
    InvalidProxy {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with status >= 400.
    #[error("{}", .head.status_message)]
    Status {
        head: Box<ResponseHead>,
        body: String,
    },

    /// `json` was requested and the body did not parse.
    #[error("{source}")]
    Json {
        #[source]
        source: serde_json::Error,
        head: Box<ResponseHead>,
    },
}

impl RequestError {
    /// Response metadata, when the failure happened after a response arrived.
    pub fn head(&self) -> Option<&ResponseHead> {
        match self {
            RequestError::Status { head, .. } | RequestError::Json { head, .. } => Some(head),
            _ => None,
        }
    }

    /// Raw body of a >= 400 response.
    pub fn body(&self) -> Option<&str> {
        match self {
            RequestError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
