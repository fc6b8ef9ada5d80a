//! Single-shot HTTP(S) request helper.
//!
//! # Overview
//! Issues one request per call, optionally through a proxy taken from the
//! environment, buffers the whole response, and reports the outcome once:
//! either returned from `Dispatcher::send` or handed to the callback given to
//! `Dispatcher::request`.
//!
//! # Design
//! - Building (`Dispatcher::prepare`) and interpreting (`interpret`) are pure;
//!   only the `Transport` does I/O, so the rules are testable offline.
//! - Proxy settings and the no-proxy predicate are injected and read per call.
//! - Header names are lower-cased with the first duplicate winning.
//! - Status >= 400 is an error that still carries the response head and body.

pub mod client;
pub mod error;
pub mod headers;
pub mod http;
pub mod options;
pub mod proxy;
pub mod transport;

pub use client::{default_dispatcher, get, interpret, post, request, Dispatcher, Outcome, RequestHandle};
pub use error::{RequestError, TransportError};
pub use headers::{headers_from_value, normalize_headers};
pub use http::{Body, HttpMethod, HttpResponse, Reply, RequestDescriptor, ResponseHead, Scheme};
pub use options::{Endpoint, RequestBody, RequestOptions};
pub use proxy::{EnvProxy, NoProxy, ProxyAgent, ProxyConfig, ProxySource};
pub use transport::{HttpTransport, Transport};
