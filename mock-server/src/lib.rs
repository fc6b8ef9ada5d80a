use std::collections::BTreeMap;

use axum::{
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What the server saw, as returned by `/echo`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    /// Request target as received. Absolute-form when the request came
    /// through a forward proxy.
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/json", get(json))
        .route("/malformed", get(malformed))
        .route("/text", get(|| async { "hello" }))
        .route("/redirect", any(redirect))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    tracing::info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        uri: uri.to_string(),
        headers,
        body,
    })
}

/// Answers with `code`; the body is the lower-cased reason phrase.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let body = status.canonical_reason().unwrap_or_default().to_lowercase();
    Ok((status, body))
}

/// `302 Found` pointing at `/text`, with a body of its own.
async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/text")], "moved")
}

async fn json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], r#"{"a":1}"#)
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{a:")
}
