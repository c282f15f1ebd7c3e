use std::sync::Arc;

use anyhow::Result;
use axum::Router;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use services::session::ListingSession;
use services::storage::{KeyValueStore, ListingStore, MemoryStore, SqliteStore};

// Application state
pub struct AppState {
    pub config: config::Config,
    pub session: ListingSession,
}

impl AppState {
    pub fn new(config: config::Config, kv: Arc<dyn KeyValueStore>) -> Self {
        let store = ListingStore::new(kv, config.storage_quota_bytes);
        let session = ListingSession::new(store, config.max_upload_bytes, config.type_sample_rows);
        Self { config, session }
    }

    /// Opens the store named by the config.
    pub fn from_config(config: config::Config) -> Result<Self> {
        let kv: Arc<dyn KeyValueStore> = if config.is_in_memory() {
            tracing::warn!("Using in-memory storage, nothing will persist");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SqliteStore::open(&config.database_path)?)
        };
        Ok(Self::new(config, kv))
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let max_body = routes::request_body_limit(state.config.max_upload_bytes);
    routes::routes(max_body).with_state(state)
}
