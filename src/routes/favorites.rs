use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    services::listings::TableView,
    services::session::FavoriteOutcome,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/favorites", get(get_favorites))
        .route("/favorites/toggle", post(toggle_favorite))
        .route("/favorites/:index", delete(remove_favorite))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub row_id: String,
}

pub async fn get_favorites(State(state): State<Arc<AppState>>) -> Json<TableView> {
    Json(state.session.favorites_view())
}

pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<FavoriteOutcome>, AppError> {
    Ok(Json(state.session.toggle_favorite(&request.row_id)?))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<FavoriteOutcome>, AppError> {
    Ok(Json(state.session.remove_favorite(index)?))
}
