//! # HTTP Boundary
//!
//! The thin axum layer over [`ShortenerService`]. Three routes, mirroring the
//! original application surface:
//!
//! - `GET /` — greeting.
//! - `GET /shorten?url=<absolute-uri>` — `200` with the short URL, `400` on
//!   missing or malformed input.
//! - `GET /go/{code}` — `302` redirect, `404` for unknown codes.

use crate::error::ShortenerError;
use crate::model::ShortCode;
use crate::service::ShortenerService;
use axum::extract::{Host, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::info;

/// Builds the application router around a service handle.
pub fn router(service: ShortenerService) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/shorten", get(shorten))
        .route("/go/:code", get(go))
        .with_state(service)
}

/// Binds `addr` and serves the router until the task is cancelled.
pub async fn serve(addr: SocketAddr, service: ShortenerService) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(service)).await
}

async fn welcome() -> &'static str {
    "Welcome to the URL shortener!"
}

#[derive(Debug, Deserialize)]
struct ShortenParams {
    url: String,
}

async fn shorten(
    State(service): State<ShortenerService>,
    Host(host): Host,
    headers: HeaderMap,
    Query(params): Query<ShortenParams>,
) -> Result<String, ApiError> {
    let code = service.shorten(&params.url).await?;
    Ok(format!("{}://{host}/go/{code}", request_scheme(&headers)))
}

/// The scheme the client reached us on. TLS terminates upstream, so trust
/// `X-Forwarded-Proto` when a proxy set it and fall back to plain http.
fn request_scheme(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
}

async fn go(
    State(service): State<ShortenerService>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let full_url = service.resolve(&ShortCode::new(code)).await?;
    // 302, matching the original behavior; axum's Redirect helpers only
    // produce 303/307/308.
    Ok((StatusCode::FOUND, [(header::LOCATION, full_url)]).into_response())
}

/// Maps the crate error taxonomy onto client-visible status codes. Ownership
/// races never reach here except through retry exhaustion, which is a
/// transient server condition.
struct ApiError(ShortenerError);

impl From<ShortenerError> for ApiError {
    fn from(e: ShortenerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ShortenerError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ShortenerError::NotFound(_) => StatusCode::NOT_FOUND,
            ShortenerError::AllocationExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.0.to_string()).into_response()
    }
}
