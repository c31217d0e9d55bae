//! Route table and middleware stack

use std::path::Path;
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use playground_core::RequestId;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tracing::Instrument;

use crate::envelope;
use crate::handlers;
use crate::state::AppState;

/// Room for 400,000 four-byte characters after JSON escaping
pub const BODY_LIMIT_BYTES: usize = 8 * 1024 * 1024;

/// Answered with 408 when exceeded
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Build the full application: API under `/api/v1`, SPA everywhere else
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    build_router_with_timeout(state, static_dir, REQUEST_TIMEOUT)
}

/// [`build_router`] with a custom per-request timeout
///
/// API requests that run out of time get a 408 JSON envelope; static file
/// requests get a bare 408.
pub fn build_router_with_timeout(
    state: AppState,
    static_dir: &Path,
    request_timeout: Duration,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/code", post(handlers::save_code))
        .route("/code/:id", get(handlers::get_code))
        .route("/execute", post(handlers::execute_code))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            api_timeout(request_timeout, req, next)
        }))
        .layer(cors)
        .with_state(state);

    // Unknown paths get index.html with 200 so client-side routes resolve
    let spa = Router::new()
        .fallback_service(
            ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html"))),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api)
        .fallback_service(spa)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(log_requests))
}

async fn api_timeout(limit: Duration, req: Request, next: Next) -> Response {
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => envelope::error(StatusCode::REQUEST_TIMEOUT, "request timed out"),
    }
}

/// Attach a request id and log one line per completed request
async fn log_requests(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::from_header(
        req.headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    req.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let started = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    tracing::info!(
        parent: &span,
        status = response.status().as_u16(),
        duration_ms,
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
