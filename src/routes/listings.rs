use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::UploadMetadata,
    services::listings::TableView,
    services::session::{UploadOutcome, UploadRequest},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listings/upload", post(upload_listings))
        .route("/listings", get(get_listings).delete(clear_listings))
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub metadata: UploadMetadata,
    pub table: TableView,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_warning: Option<String>,
}

pub async fn upload_listings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadOutcome>, AppError> {
    let start = std::time::Instant::now();
    tracing::info!("Upload received: {}", request.file_name);

    let outcome = state.session.upload(request).await?;

    tracing::info!("Upload processed in {:?}", start.elapsed());
    Ok(Json(outcome))
}

pub async fn get_listings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListingsResponse>, AppError> {
    let (metadata, table) = state.session.listings()?;
    Ok(Json(ListingsResponse { metadata, table }))
}

pub async fn clear_listings(State(state): State<Arc<AppState>>) -> Json<ClearResponse> {
    let storage_warning = state.session.clear().await;
    Json(ClearResponse {
        cleared: true,
        storage_warning,
    })
}
