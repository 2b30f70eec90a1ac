use axum::Router;
use tower_http::cors::CorsLayer;

use crate::AppState;

pub mod assets;
pub mod health;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health::router())
        .merge(assets::router())
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
