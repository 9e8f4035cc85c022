use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{AppState, router};
use services::services::{config::Config, image_store::ImageStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());

    let db = DBService::new(&config.database_path)
        .await
        .context("failed to open database")?;

    let images = ImageStore::new(config.upload_dir.clone());
    images
        .init()
        .await
        .context("failed to create upload directory")?;

    let addr = config.bind_addr();
    let state = AppState::new(db, config, images);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "maintenance reporter listening");

    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}
