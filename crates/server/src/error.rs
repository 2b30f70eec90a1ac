use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::asset_editor::AssetEditorError;
use storage::{AssetStoreError, BlobError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Editor(#[from] AssetEditorError),
    #[error(transparent)]
    Storage(#[from] AssetStoreError),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, message) = match &self {
            ApiError::Editor(err) => match err {
                AssetEditorError::NotFound(id) => {
                    (StatusCode::NOT_FOUND, format!("Asset not found: {id}"))
                }
                AssetEditorError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                AssetEditorError::Provider(e) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
                // The client handed us bytes no image decoder understands.
                AssetEditorError::Thumbnail(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                AssetEditorError::Storage(e) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            },
            ApiError::Storage(err) => match err {
                AssetStoreError::NotFound(id) => {
                    (StatusCode::NOT_FOUND, format!("Asset not found: {id}"))
                }
                AssetStoreError::Blob(BlobError::NotFound(id)) => {
                    (StatusCode::NOT_FOUND, format!("Image file not found for asset {id}"))
                }
                other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            },
            ApiError::Multipart(_) => (
                StatusCode::BAD_REQUEST,
                "Failed to upload file. Please ensure the file is valid and try again."
                    .to_string(),
            ),
            ApiError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let response = ApiResponse::<()>::error(&message);
        (status_code, Json(response)).into_response()
    }
}
