use anyhow::Result;
use std::sync::Arc;

use listing_services::{app, config, logging, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.bind_addr;

    // Build our application state and pick up the last session
    let state = Arc::new(AppState::from_config(config)?);
    if state.session.restore().await? {
        tracing::info!("Restored listings from previous session");
    }

    let app = app(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
