//! The I/O boundary.
//!
//! A `Transport` executes one `RequestDescriptor` and returns the fully
//! buffered response. `HttpTransport` is the reqwest-backed default.

use std::future::Future;

use hyper::ext::ReasonPhrase;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Proxy, Response, StatusCode};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpResponse, RequestDescriptor};
use crate::proxy::ProxyAgent;

pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// reqwest-backed transport.
///
/// reqwest's own environment proxy detection is disabled: proxy selection
/// has already happened by the time a descriptor gets here. Proxied requests
/// get a client configured for that proxy. Redirects are never followed; a
/// 3xx comes back as the reply to the request that was sent.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    direct: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let direct = Client::builder()
            .no_proxy()
            .redirect(Policy::none())
            .build()?;
        Ok(Self { direct })
    }

    fn client_for(&self, proxy: Option<&ProxyAgent>) -> Result<Client, TransportError> {
        match proxy {
            None => Ok(self.direct.clone()),
            Some(agent) => {
                let proxy = Proxy::all(agent.uri.as_str())?;
                Ok(Client::builder()
                    .proxy(proxy)
                    .redirect(Policy::none())
                    .build()?)
            }
        }
    }
}

/// The reason phrase the server sent. hyper only records it when it differs
/// from the canonical one for the code.
fn status_message(response: &Response, status: StatusCode) -> String {
    match response.extensions().get::<ReasonPhrase>() {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => status.canonical_reason().unwrap_or_default().to_string(),
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        let client = self.client_for(request.proxy.as_ref())?;

        let mut builder = client.request(method(request.method), request.url.clone());
        for (name, value) in request.wire_headers() {
            builder = builder.header(name, value);
        }
        if let Some(payload) = request.payload() {
            builder = builder.body(payload.to_string());
        }

        let response = builder.send().await?;
        let status = response.status();
        let status_message = status_message(&response, status);
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_message,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
