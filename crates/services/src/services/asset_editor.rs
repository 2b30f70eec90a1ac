//! Versioning operations over the asset store: edit an asset into a new
//! version of the same chain, fork one into an independent root, ingest
//! uploads, and swap image payloads in place.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use storage::{
    AssetStore, AssetStoreError, BlobError, asset_id,
    models::{Asset, AssetFormat, AssetType, EditHistoryEntry},
};

use super::{
    image_edit::{ImageEditError, ImageEditProvider, ImageEditRequest},
    thumbnails::{ThumbnailError, ThumbnailService, aspect_ratio},
};

/// Upload ceiling, matching the API's documented 10 MB limit.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PROVIDER_UPLOAD: &str = "upload";
const PROVIDER_AI_EDITED: &str = "ai-edited";

#[derive(Debug, Error)]
pub enum AssetEditorError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Image edit failed: {0}")]
    Provider(#[from] ImageEditError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
    #[error(transparent)]
    Storage(AssetStoreError),
}

impl From<AssetStoreError> for AssetEditorError {
    fn from(err: AssetStoreError) -> Self {
        match err {
            AssetStoreError::NotFound(id) => AssetEditorError::NotFound(id),
            other => AssetEditorError::Storage(other),
        }
    }
}

/// Body of `POST /assets/{id}/save-as-new`. The inline payload carries what
/// storage cannot provide when the source only ever lived client-side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAsNewRequest {
    pub image_base64: Option<String>,
    pub metadata: Option<SaveAsNewMetadata>,
    pub edit_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAsNewMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<AssetType>,
    pub project_id: Option<String>,
    pub generation_prompt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub format: Option<AssetFormat>,
}

/// A validated multipart upload, ready for ingestion.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub project_id: String,
    pub asset_type: AssetType,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct AssetEditorService {
    store: AssetStore,
    provider: Arc<dyn ImageEditProvider>,
    thumbnails: ThumbnailService,
}

impl AssetEditorService {
    pub fn new(store: AssetStore, provider: Arc<dyn ImageEditProvider>) -> Self {
        Self {
            store,
            provider,
            thumbnails: ThumbnailService::new(),
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Produce the next version in the source asset's chain.
    ///
    /// The source record is never mutated; the new asset carries
    /// `version + 1`, a parent reference, and the extended edit history.
    pub async fn edit_asset(
        &self,
        id: &str,
        edit_prompt: &str,
        model: Option<String>,
    ) -> Result<Asset, AssetEditorError> {
        let edit_prompt = edit_prompt.trim();
        if edit_prompt.is_empty() {
            return Err(AssetEditorError::Validation(
                "editPrompt is required".to_string(),
            ));
        }

        let source = self.store.get_asset(id).await?;

        let bytes = self
            .provider
            .edit(&ImageEditRequest {
                base_image_url: source.url.clone(),
                original_description: source.description.clone(),
                edit_prompt: edit_prompt.to_string(),
                aspect_ratio: source.aspect_ratio.clone(),
                model,
            })
            .await?;

        // Bytes the provider hands back that won't decode are its failure,
        // not the client's.
        let (width, height) = self.thumbnails.dimensions(&bytes).map_err(|e| {
            ImageEditError::Parse(format!("provider returned an unusable image: {e}"))
        })?;
        let thumbnail = self.thumbnails.generate(&bytes, source.format).map_err(|e| {
            ImageEditError::Parse(format!("provider returned an unusable image: {e}"))
        })?;

        let now = Utc::now();
        let new_id = asset_id::generate(Some(&source.name));

        let mut edit_history = source.edit_history.clone();
        edit_history.push(EditHistoryEntry {
            timestamp: now,
            edit_prompt: edit_prompt.to_string(),
            previous_asset_id: source.id.clone(),
        });

        let asset = Asset {
            id: new_id.clone(),
            asset_type: source.asset_type,
            category: source.category.clone(),
            name: source.name.clone(),
            description: source.description.clone(),
            generation_prompt: source.generation_prompt.clone(),
            provider: source.provider.clone(),
            project_id: source.project_id.clone(),
            tags: source.tags.clone(),
            related_assets: source.related_assets.clone(),
            used_in_scenes: source.used_in_scenes.clone(),
            version: source.version + 1,
            parent_asset_id: Some(source.id.clone()),
            edit_history,
            format: source.format,
            aspect_ratio: aspect_ratio(width, height),
            width,
            height,
            file_size: bytes.len() as u64,
            url: asset_file_url(&new_id),
            thumbnail_url: asset_thumbnail_url(&new_id),
            created_at: now,
            updated_at: now,
        };

        self.store.save_asset(&asset, &bytes).await?;
        self.store
            .save_thumbnail(&asset.id, asset.format, &thumbnail)
            .await?;

        tracing::info!(
            "Edited {} -> {} (v{} -> v{})",
            source.id,
            asset.id,
            source.version,
            asset.version
        );
        Ok(asset)
    }

    /// Fork an asset (persisted or client-side) into an independent root.
    ///
    /// Lineage is intentionally discarded: the result is v1 with no parent
    /// and no history; only the recorded generation prompt ties it back to
    /// its visual origin.
    pub async fn save_as_new(
        &self,
        id: &str,
        request: SaveAsNewRequest,
    ) -> Result<Asset, AssetEditorError> {
        let source = self.store.try_get_asset(id).await?;

        if source.is_none() && (request.image_base64.is_none() || request.metadata.is_none()) {
            return Err(AssetEditorError::Validation(format!(
                "Asset {id} is not stored; imageBase64 and metadata are required to save it"
            )));
        }

        let metadata = request.metadata.clone().unwrap_or_default();

        let bytes = match &request.image_base64 {
            Some(encoded) => decode_image_base64(encoded)?,
            None => match &source {
                Some(source) => {
                    let data = self
                        .store
                        .blobs()
                        .read_image(&source.id, source.format)
                        .await
                        .map_err(|e| match e {
                            BlobError::NotFound(missing) => AssetEditorError::NotFound(missing),
                            other => AssetEditorError::Storage(other.into()),
                        })?;
                    Bytes::from(data)
                }
                // Unreachable by the guard above, but keep the error honest.
                None => return Err(AssetEditorError::NotFound(id.to_string())),
            },
        };

        let name = metadata
            .name
            .clone()
            .or_else(|| source.as_ref().map(|s| s.name.clone()))
            .unwrap_or_else(|| "Untitled asset".to_string());

        let generation_prompt = request
            .edit_prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| {
                source
                    .as_ref()
                    .and_then(|s| s.edit_history.last().map(|e| e.edit_prompt.clone()))
            })
            .or_else(|| source.as_ref().map(|s| s.generation_prompt.clone()))
            .or(metadata.generation_prompt.clone())
            .unwrap_or_default();

        let asset_type = metadata
            .asset_type
            .or_else(|| source.as_ref().map(|s| s.asset_type))
            .unwrap_or(AssetType::Prop);

        let format = metadata
            .format
            .or_else(|| source.as_ref().map(|s| s.format))
            .unwrap_or(AssetFormat::Png);

        let (width, height) = self.thumbnails.dimensions(&bytes)?;
        let thumbnail = self.thumbnails.generate(&bytes, format)?;

        let now = Utc::now();
        let new_id = asset_id::generate(Some(&name));

        let asset = Asset {
            id: new_id.clone(),
            asset_type,
            category: asset_type.category().to_string(),
            name,
            description: metadata
                .description
                .or_else(|| source.as_ref().map(|s| s.description.clone()))
                .unwrap_or_default(),
            generation_prompt,
            provider: PROVIDER_AI_EDITED.to_string(),
            project_id: metadata
                .project_id
                .or_else(|| source.as_ref().map(|s| s.project_id.clone()))
                .unwrap_or_default(),
            tags: metadata
                .tags
                .or_else(|| source.as_ref().map(|s| s.tags.clone()))
                .unwrap_or_default(),
            related_assets: source
                .as_ref()
                .map(|s| s.related_assets.clone())
                .unwrap_or_default(),
            used_in_scenes: source
                .as_ref()
                .map(|s| s.used_in_scenes.clone())
                .unwrap_or_default(),
            version: 1,
            parent_asset_id: None,
            edit_history: Vec::new(),
            format,
            aspect_ratio: aspect_ratio(width, height),
            width,
            height,
            file_size: bytes.len() as u64,
            url: asset_file_url(&new_id),
            thumbnail_url: asset_thumbnail_url(&new_id),
            created_at: now,
            updated_at: now,
        };

        self.store.save_asset(&asset, &bytes).await?;
        self.store
            .save_thumbnail(&asset.id, asset.format, &thumbnail)
            .await?;

        tracing::info!("Saved {} as new root asset {}", id, asset.id);
        Ok(asset)
    }

    /// Ingest an uploaded image as a brand-new root asset.
    pub async fn upload_asset(&self, request: UploadRequest) -> Result<Asset, AssetEditorError> {
        let format = AssetFormat::from_mime(&request.mime_type).ok_or_else(|| {
            AssetEditorError::Validation(
                "This file type is not supported. Please upload a PNG, JPEG, or WebP image."
                    .to_string(),
            )
        })?;

        if request.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AssetEditorError::Validation(format!(
                "This image is too large ({:.1} MB). Maximum file size is {:.1} MB.",
                request.bytes.len() as f64 / 1_048_576.0,
                MAX_UPLOAD_BYTES as f64 / 1_048_576.0
            )));
        }

        let (width, height) = self.thumbnails.dimensions(&request.bytes)?;
        let thumbnail = self.thumbnails.generate(&request.bytes, format)?;

        let now = Utc::now();
        let new_id = asset_id::generate(Some(&request.name));

        let asset = Asset {
            id: new_id.clone(),
            asset_type: request.asset_type,
            category: request.asset_type.category().to_string(),
            name: request.name,
            description: request.description.unwrap_or_default(),
            generation_prompt: String::new(),
            provider: PROVIDER_UPLOAD.to_string(),
            project_id: request.project_id,
            tags: Vec::new(),
            related_assets: Vec::new(),
            used_in_scenes: Vec::new(),
            version: 1,
            parent_asset_id: None,
            edit_history: Vec::new(),
            format,
            aspect_ratio: aspect_ratio(width, height),
            width,
            height,
            file_size: request.bytes.len() as u64,
            url: asset_file_url(&new_id),
            thumbnail_url: asset_thumbnail_url(&new_id),
            created_at: now,
            updated_at: now,
        };

        self.store.save_asset(&asset, &request.bytes).await?;
        self.store
            .save_thumbnail(&asset.id, asset.format, &thumbnail)
            .await?;

        tracing::info!("Uploaded new {} asset {}", asset.category, asset.id);
        Ok(asset)
    }

    /// Swap the image payload of an existing asset (PATCH with imageBase64),
    /// regenerating the thumbnail and media descriptors.
    pub async fn replace_image(
        &self,
        id: &str,
        image_base64: &str,
    ) -> Result<Asset, AssetEditorError> {
        let bytes = decode_image_base64(image_base64)?;
        let (width, height) = self.thumbnails.dimensions(&bytes)?;

        let asset = self.store.get_asset(id).await?;
        let thumbnail = self.thumbnails.generate(&bytes, asset.format)?;

        let updated = self
            .store
            .replace_image(
                id,
                &bytes,
                &thumbnail,
                width,
                height,
                aspect_ratio(width, height),
            )
            .await?;
        Ok(updated)
    }
}

fn asset_file_url(id: &str) -> String {
    format!("/api/assets/{id}/file")
}

fn asset_thumbnail_url(id: &str) -> String {
    format!("/api/assets/{id}/thumbnail")
}

/// Decode a base64 image payload, tolerating a `data:` URL prefix.
fn decode_image_base64(encoded: &str) -> Result<Bytes, AssetEditorError> {
    let raw = encoded
        .split_once(";base64,")
        .map(|(_, tail)| tail)
        .unwrap_or(encoded);
    BASE64
        .decode(raw.trim())
        .map(Bytes::from)
        .map_err(|e| AssetEditorError::Validation(format!("imageBase64 is not valid base64: {e}")))
}
