//! The request dispatcher.
//!
//! # Design
//! A request moves through three steps. `Dispatcher::prepare` validates the
//! inputs and builds a `RequestDescriptor`, `Transport::execute` does the
//! round-trip, and `interpret` maps the buffered response onto an `Outcome`.
//! `prepare` and `interpret` never touch the network, so every validation
//! and status rule is testable without a server.
//!
//! `send` returns the outcome directly. `request` runs `send` on a tokio
//! task and hands the outcome to an `FnOnce` callback. The callback sits in a
//! slot shared by the task and the `RequestHandle`; whichever takes it first
//! calls it, so it runs exactly once even when the request is aborted.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::error::{RequestError, TransportError};
use crate::headers::normalize_headers;
use crate::http::{Body, HttpMethod, HttpResponse, Reply, RequestDescriptor, Scheme};
use crate::options::{Endpoint, RequestBody, RequestOptions};
use crate::proxy::{env_bypass, EnvProxy, ProxyAgent, ProxySource};
use crate::transport::{HttpTransport, Transport};

/// What a request completes with.
pub type Outcome = Result<Reply, RequestError>;

type Bypass = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Issues single HTTP requests.
///
/// Holds no per-request state; cloning is cheap and clones share the
/// transport.
pub struct Dispatcher<T = HttpTransport> {
    transport: Arc<T>,
    proxies: Arc<dyn ProxySource>,
    bypass: Bypass,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            proxies: Arc::clone(&self.proxies),
            bypass: Arc::clone(&self.bypass),
        }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher<HttpTransport> {
    /// Dispatcher over reqwest, with proxies from the process environment.
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self::with_transport(HttpTransport::new()?))
    }
}

impl<T: Transport + 'static> Dispatcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            proxies: Arc::new(EnvProxy::new()),
            bypass: Arc::new(env_bypass),
        }
    }

    /// Replace where proxy URIs come from.
    pub fn proxy_source(mut self, source: impl ProxySource + 'static) -> Self {
        self.proxies = Arc::new(source);
        self
    }

    /// Replace the host exclusion predicate. Hosts it accepts connect directly.
    pub fn bypass<F>(mut self, bypass: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.bypass = Arc::new(bypass);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validate inputs and build the descriptor. No I/O.
    pub fn prepare(
        &self,
        endpoint: &Endpoint,
        options: &RequestOptions,
    ) -> Result<RequestDescriptor, RequestError> {
        let target = match endpoint {
            Endpoint::Url(url) => Target::Parsed(url),
            Endpoint::Str(raw) if !raw.is_empty() => Target::Raw(raw),
            Endpoint::Other(value) => return Err(RequestError::InvalidUri(value.to_string())),
            _ => return Err(RequestError::MissingEndpoint),
        };

        let method = match options.method.as_deref() {
            None | Some("") => HttpMethod::Get,
            Some(raw) => raw
                .parse()
                .map_err(|()| RequestError::InvalidMethod(raw.to_string()))?,
        };

        let url = match target {
            Target::Parsed(url) => url.clone(),
            Target::Raw(raw) => Url::parse(raw)?,
        };
        let mut headers = normalize_headers(options.headers.iter().map(|(k, v)| (k, v.clone())));

        let scheme = Scheme::from_url(&url)
            .ok_or_else(|| RequestError::InvalidProtocol(format!("{}:", url.scheme())))?;

        let host = url.host_str().unwrap_or_default();
        let proxy = match self.proxies.proxy_for(scheme) {
            Some(raw) if !(self.bypass)(host) => Some(
                ProxyAgent::new(scheme, &raw)
                    .map_err(|source| RequestError::InvalidProxy { uri: raw.clone(), source })?,
            ),
            _ => None,
        };

        let body = match &options.body {
            Some(RequestBody::Text(text)) if !text.is_empty() => Some(text.clone()),
            Some(RequestBody::Json(value)) if !value.is_null() => {
                let unset = headers
                    .iter()
                    .find(|(key, _)| key == "content-type")
                    .map_or(true, |(_, value)| value.is_empty());
                if unset {
                    set_header(&mut headers, "content-type", "application/json".to_string());
                }
                Some(value.to_string())
            }
            _ => None,
        };
        if let Some(body) = &body {
            set_header(&mut headers, "content-length", body.len().to_string());
        }

        Ok(RequestDescriptor {
            method,
            url,
            headers,
            body,
            proxy,
        })
    }

    /// Run one request to completion.
    pub async fn send(&self, endpoint: impl Into<Endpoint>, options: RequestOptions) -> Outcome {
        let endpoint = endpoint.into();
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("request", %request_id);

        async move {
            let descriptor = self.prepare(&endpoint, &options).inspect_err(|err| {
                tracing::debug!(error = %err, "Rejected request");
            })?;

            tracing::debug!(
                method = %descriptor.method,
                uri = %descriptor.url,
                proxied = descriptor.proxy.is_some(),
                "Dispatching request"
            );

            let response = self
                .transport
                .execute(&descriptor)
                .await
                .inspect_err(|err| tracing::warn!(error = %err, "Transport failure"))?;

            tracing::debug!(status = response.status, "Response received");
            interpret(response, options.json)
        }
        .instrument(span)
        .await
    }

    /// Start a request and deliver its outcome to `callback`.
    ///
    /// A missing endpoint, or no tokio runtime to spawn onto, is reported
    /// here and the callback is dropped uncalled. Every other failure reaches
    /// the callback.
    pub fn request<F>(
        &self,
        endpoint: impl Into<Endpoint>,
        options: RequestOptions,
        callback: F,
    ) -> Result<RequestHandle, RequestError>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let endpoint = endpoint.into();
        if endpoint.is_missing() {
            return Err(RequestError::MissingEndpoint);
        }

        let runtime = Handle::try_current().map_err(|_| RequestError::NoRuntime)?;

        let callback: Callback = Box::new(callback);
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(callback)));
        let dispatcher = self.clone();
        let pending = Arc::clone(&slot);
        let task = runtime.spawn(async move {
            let outcome = dispatcher.send(endpoint, options).await;
            if let Some(callback) = take_callback(&pending) {
                callback(outcome);
            }
        });
        Ok(RequestHandle {
            task,
            callback: slot,
        })
    }

    /// `request` with the method fixed to GET.
    pub fn get<F>(
        &self,
        endpoint: impl Into<Endpoint>,
        options: Option<RequestOptions>,
        callback: F,
    ) -> Result<RequestHandle, RequestError>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        self.request(endpoint, fixed_method(options, HttpMethod::Get), callback)
    }

    /// `request` with the method fixed to POST.
    pub fn post<F>(
        &self,
        endpoint: impl Into<Endpoint>,
        options: Option<RequestOptions>,
        callback: F,
    ) -> Result<RequestHandle, RequestError>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        self.request(endpoint, fixed_method(options, HttpMethod::Post), callback)
    }
}

enum Target<'a> {
    Parsed(&'a Url),
    Raw(&'a str),
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(key, _)| key == name) {
        Some((_, existing)) => *existing = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// The wrapper's verb wins over a method given in the options.
fn fixed_method(options: Option<RequestOptions>, method: HttpMethod) -> RequestOptions {
    let mut options = options.unwrap_or_default();
    if let Some(requested) = options.method.as_deref().filter(|m| *m != method.as_str()) {
        tracing::debug!(requested, fixed = %method, "Ignoring method option in verb wrapper");
    }
    options.method = Some(method.as_str().to_string());
    options
}

/// Map a buffered response onto an outcome.
///
/// Status >= 400 is an error that still carries the head and raw body. With
/// `json` set, a non-empty body must parse.
pub fn interpret(response: HttpResponse, json: bool) -> Outcome {
    let (head, body) = response.into_parts();

    if head.status >= 400 {
        return Err(RequestError::Status {
            head: Box::new(head),
            body,
        });
    }

    if json && !body.is_empty() {
        return match serde_json::from_str(&body) {
            Ok(value) => Ok(Reply {
                head,
                body: Body::Json(value),
            }),
            Err(source) => Err(RequestError::Json {
                source,
                head: Box::new(head),
            }),
        };
    }

    Ok(Reply {
        head,
        body: Body::Text(body),
    })
}

type Callback = Box<dyn FnOnce(Outcome) + Send>;
type CallbackSlot = Arc<Mutex<Option<Callback>>>;

fn take_callback(slot: &Mutex<Option<Callback>>) -> Option<Callback> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// The in-flight request started by `Dispatcher::request`.
pub struct RequestHandle {
    task: JoinHandle<()>,
    callback: CallbackSlot,
}

impl RequestHandle {
    /// Stop the request.
    ///
    /// If the callback has not been called yet it is called here, on the
    /// calling thread, with a `Transport("aborted")` outcome. Aborting a
    /// finished request does nothing.
    pub fn abort(&self) {
        self.task.abort();
        if let Some(callback) = take_callback(&self.callback) {
            tracing::debug!("Request aborted before completion");
            callback(Err(RequestError::Transport(TransportError::new("aborted"))));
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the callback has returned. Fails with a cancelled
    /// `JoinError` after `abort`.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

static DEFAULT: OnceLock<Result<Dispatcher, TransportError>> = OnceLock::new();

/// The process-wide dispatcher used by the free functions.
pub fn default_dispatcher() -> Result<&'static Dispatcher, TransportError> {
    DEFAULT.get_or_init(Dispatcher::<HttpTransport>::new).as_ref().map_err(Clone::clone)
}

/// `Dispatcher::request` on the default dispatcher.
pub fn request<F>(
    endpoint: impl Into<Endpoint>,
    options: RequestOptions,
    callback: F,
) -> Result<RequestHandle, RequestError>
where
    F: FnOnce(Outcome) + Send + 'static,
{
    default_dispatcher()?.request(endpoint, options, callback)
}

/// `Dispatcher::get` on the default dispatcher.
pub fn get<F>(
    endpoint: impl Into<Endpoint>,
    options: Option<RequestOptions>,
    callback: F,
) -> Result<RequestHandle, RequestError>
where
    F: FnOnce(Outcome) + Send + 'static,
{
    default_dispatcher()?.get(endpoint, options, callback)
}

/// `Dispatcher::post` on the default dispatcher.
pub fn post<F>(
    endpoint: impl Into<Endpoint>,
    options: Option<RequestOptions>,
    callback: F,
) -> Result<RequestHandle, RequestError>
where
    F: FnOnce(Outcome) + Send + 'static,
{
    default_dispatcher()?.post(endpoint, options, callback)
}
