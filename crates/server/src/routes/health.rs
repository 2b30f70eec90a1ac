use axum::{Router, response::Json as ResponseJson, routing::get};
use utils::response::ApiResponse;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check() -> ResponseJson<ApiResponse<&'static str>> {
    ResponseJson(ApiResponse::success("ok"))
}
