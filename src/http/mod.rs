//! HTTP gateway: routes, CORS, body limits and static serving of outputs

pub mod error;
pub mod extract;
pub mod handlers;
pub mod server;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::adapters::fs_local::TRIMMED_ROUTE;
use crate::app::AppContainer;

pub use error::{ErrorResponse, HttpAppError};
pub use server::{serve, shutdown_signal};

/// Allowance for multipart boundaries and part headers on top of the file
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub container: Arc<dyn AppContainer>,
}

/// Largest request body accepted for an upload limit of `limit` file bytes
pub fn multipart_body_limit(limit: u64) -> u64 {
    limit.saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// Build the application router
pub fn router(container: Arc<dyn AppContainer>, allowed_origins: &[String]) -> Router {
    let body_limit = multipart_body_limit(container.upload_interactor().max_upload_bytes());
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let trimmed_dir = container.artifact_store().trimmed_dir().to_path_buf();
    let trimmed = Router::new()
        .nest_service(
            TRIMMED_ROUTE,
            ServeDir::new(trimmed_dir).append_index_html_on_directories(false),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            playback_content_type,
        ))
        .layer(middleware::from_fn(hide_staged_outputs));

    let state = AppState { container };

    Router::new()
        .route("/", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/trim", post(handlers::trim))
        .with_state(state)
        .merge(trimmed)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Outputs are always MP4; only successful responses carry a body to label
fn playback_content_type(response: &Response) -> Option<HeaderValue> {
    response
        .status()
        .is_success()
        .then(|| HeaderValue::from_static("video/mp4"))
}

/// Outputs still being encoded live under dot-prefixed names; never serve them
async fn hide_staged_outputs(request: Request, next: Next) -> Response {
    let name = request.uri().path().rsplit('/').next().unwrap_or_default();
    let lowered = name.to_ascii_lowercase();
    if lowered.starts_with('.') || lowered.starts_with("%2e") {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        info!("CORS configured to allow all origins");
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    info!(origins = ?allowed_origins, "CORS restricted to configured origins");
    cors.allow_origin(origins)
}
