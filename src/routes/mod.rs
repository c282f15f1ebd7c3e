use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod favorites;
pub mod listings;

/// Room for JSON escaping around an upload of `max_upload_bytes`.
pub fn request_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_mul(6).saturating_add(64 * 1024)
}

pub fn routes(max_body: usize) -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .merge(listings::routes())
        .merge(favorites::routes())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}
