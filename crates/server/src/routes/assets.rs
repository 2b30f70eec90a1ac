use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use services::services::asset_editor::{SaveAsNewRequest, UploadRequest};
use storage::{
    AssetStoreError, walk_lineage,
    models::{Asset, AssetType, UpdateAssetFields},
};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// Upload request bodies may carry a 10 MB image plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = 12 * 1024 * 1024;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssetsQuery {
    pub project_id: String,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetPayload {
    #[serde(flatten)]
    pub fields: UpdateAssetFields,
    pub image_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAssetPayload {
    pub edit_prompt: String,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetVersionsResponse {
    pub asset_id: String,
    pub current_version: u32,
    pub total_versions: usize,
    pub lineage: Vec<Asset>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/assets", get(list_assets))
        .route("/assets/upload", post(upload_asset))
        .route(
            "/assets/{id}",
            get(get_asset).patch(update_asset).delete(delete_asset),
        )
        .route("/assets/{id}/versions", get(get_versions))
        .route("/assets/{id}/edit", post(edit_asset))
        .route("/assets/{id}/save-as-new", post(save_as_new))
        .route("/assets/{id}/file", get(get_asset_file))
        .route("/assets/{id}/thumbnail", get(get_asset_thumbnail))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<ListAssetsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Asset>>>, ApiError> {
    let asset_type = match &query.asset_type {
        Some(raw) => Some(AssetType::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown asset type: {raw}"))
        })?),
        None => None,
    };

    let assets = state
        .store()
        .list_by_project(&query.project_id, asset_type)
        .await?;
    Ok(ResponseJson(ApiResponse::success(assets)))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<Asset>>, ApiError> {
    let asset = state.store().get_asset(&id).await?;
    Ok(ResponseJson(ApiResponse::success(asset)))
}

pub async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAssetPayload>,
) -> Result<ResponseJson<ApiResponse<Asset>>, ApiError> {
    if let Some(encoded) = &payload.image_base64 {
        state.editor.replace_image(&id, encoded).await?;
    }

    let asset = if payload.fields.is_empty() {
        state.store().get_asset(&id).await?
    } else {
        state.store().update_asset(&id, &payload.fields).await?
    };
    Ok(ResponseJson(ApiResponse::success(asset)))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let store = state.store();

    // Files first, then the metadata record; both sides tolerate absence so
    // a half-finished cleanup can be retried.
    if let Some(asset) = store.try_get_asset(&id).await? {
        store
            .blobs()
            .remove(&asset.id, asset.format)
            .await
            .map_err(AssetStoreError::from)?;
    }
    store.delete_asset(&id).await?;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<AssetVersionsResponse>>, ApiError> {
    let lineage = walk_lineage(state.store(), &id).await?;
    Ok(ResponseJson(ApiResponse::success(AssetVersionsResponse {
        asset_id: id,
        current_version: lineage.current_version,
        total_versions: lineage.total_versions(),
        lineage: lineage.chain,
    })))
}

pub async fn edit_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<EditAssetPayload>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Asset>>), ApiError> {
    let asset = state
        .editor
        .edit_asset(&id, &payload.edit_prompt, payload.model)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(asset))))
}

pub async fn save_as_new(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SaveAsNewRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Asset>>), ApiError> {
    let asset = state.editor.save_as_new(&id, payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(asset))))
}

pub async fn upload_asset(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Asset>>), ApiError> {
    let mut file: Option<(Bytes, String)> = None;
    let mut project_id: Option<String> = None;
    let mut asset_type: Option<String> = None;
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "file" => {
                let mime_type = field.content_type().unwrap_or_default().to_string();
                file = Some((field.bytes().await?, mime_type));
            }
            "projectId" => project_id = Some(field.text().await?),
            "type" => asset_type = Some(field.text().await?),
            "name" => name = Some(field.text().await?),
            "description" => description = Some(field.text().await?),
            other => tracing::debug!("Ignoring unknown upload field '{}'", other),
        }
    }

    let (bytes, mime_type) =
        file.ok_or_else(|| ApiError::BadRequest("file field is required".to_string()))?;
    let project_id = project_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("projectId is required".to_string()))?;
    let name = name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;
    let asset_type = AssetType::parse(asset_type.as_deref().unwrap_or_default())
        .ok_or_else(|| {
            ApiError::BadRequest(
                "type must be one of character, prop, location, effect, storyboard".to_string(),
            )
        })?;

    let asset = state
        .editor
        .upload_asset(UploadRequest {
            project_id,
            asset_type,
            name,
            description,
            mime_type,
            bytes,
        })
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(asset))))
}

pub async fn get_asset_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let asset = state.store().get_asset(&id).await?;
    let bytes = state
        .store()
        .blobs()
        .read_image(&asset.id, asset.format)
        .await
        .map_err(AssetStoreError::from)?;
    Ok(([(header::CONTENT_TYPE, asset.format.mime())], bytes).into_response())
}

pub async fn get_asset_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let asset = state.store().get_asset(&id).await?;
    let bytes = state
        .store()
        .blobs()
        .read_thumbnail(&asset.id, asset.format)
        .await
        .map_err(AssetStoreError::from)?;
    Ok(([(header::CONTENT_TYPE, asset.format.mime())], bytes).into_response())
}
