use std::sync::Arc;

use anyhow::Error as AnyhowError;
use server::{AppState, routes};
use services::services::{asset_editor::AssetEditorService, image_edit::GeminiImageEdit};
use storage::{AssetStore, AssetStoreError};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::assets::data_dir;

#[derive(Debug, Error)]
pub enum EchoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] AssetStoreError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), EchoError> {
    // Load environment variables from `.env` if present so local development
    // picks up API keys
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},storage={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let data_dir = data_dir();
    tracing::info!("Asset data directory: {}", data_dir.display());

    let store = AssetStore::new(&data_dir)?;
    let provider = Arc::new(GeminiImageEdit::new());
    let state = AppState::new(AssetEditorService::new(store, provider));

    let app_router = routes::router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or_else(|| {
            tracing::info!("No PORT environment variable set, using port 0 for auto-assignment");
            0
        });

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();

    tracing::info!("Server running on http://{host}:{actual_port}");

    axum::serve(listener, app_router).await?;
    Ok(())
}
