pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use db::DBService;
use services::services::{auth::AuthService, config::Config, image_store::ImageStore};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Uploads are photos from phones; the axum default of 2 MiB is too small.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub config: Arc<Config>,
    pub images: ImageStore,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(db: DBService, config: Arc<Config>, images: ImageStore) -> Self {
        let auth = AuthService::new(db.pool.clone(), &config);
        Self {
            db,
            config,
            images,
            auth,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::tickets::router());

    Router::new()
        .merge(routes::health::router())
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.config.upload_dir.clone()))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
