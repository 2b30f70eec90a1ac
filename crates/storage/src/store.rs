use std::{path::Path, sync::Arc};

use chrono::Utc;
use thiserror::Error;

use crate::{
    blob::{BlobError, BlobStore},
    models::{Asset, AssetFormat, AssetType, UpdateAssetFields},
    repository::{FsRepository, Repository, RepositoryError},
};

const METADATA_SUBDIR: &str = "metadata";
const ASSETS_SUBDIR: &str = "assets";

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Single point of truth for asset records and their binary payloads.
///
/// The metadata record and the blob file for an id are created together
/// (blob first, then metadata; the blob is cleaned up when the metadata
/// write fails) so the two stores cannot silently diverge on the write path.
/// Divergence produced by outside interference is handled softly on reads.
#[derive(Clone)]
pub struct AssetStore {
    repo: Arc<dyn Repository<Asset>>,
    blobs: Arc<BlobStore>,
}

impl AssetStore {
    /// Open a store rooted at `root`, creating the `metadata/` and `assets/`
    /// subdirectories as needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, AssetStoreError> {
        let root = root.as_ref();
        let repo: FsRepository<Asset> = FsRepository::new(root.join(METADATA_SUBDIR))?;
        let blobs = BlobStore::new(root.join(ASSETS_SUBDIR))?;
        Ok(Self {
            repo: Arc::new(repo),
            blobs: Arc::new(blobs),
        })
    }

    /// Assemble a store over an arbitrary repository implementation.
    pub fn with_repository(repo: Arc<dyn Repository<Asset>>, blobs: BlobStore) -> Self {
        Self {
            repo,
            blobs: Arc::new(blobs),
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub async fn get_asset(&self, id: &str) -> Result<Asset, AssetStoreError> {
        self.try_get_asset(id)
            .await?
            .ok_or_else(|| AssetStoreError::NotFound(id.to_string()))
    }

    /// Like `get_asset`, but absence is an ordinary outcome. Used by the
    /// lineage walker and by save-as-new, where a missing record is handled
    /// rather than fatal.
    pub async fn try_get_asset(&self, id: &str) -> Result<Option<Asset>, AssetStoreError> {
        match self.repo.get(id).await {
            Ok(found) => Ok(found),
            Err(RepositoryError::InvalidKey(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a newly minted asset: image blob first, then the metadata
    /// record. When the metadata write fails the blob is removed again so no
    /// orphaned file is left behind, and the error propagates.
    pub async fn save_asset(&self, asset: &Asset, image: &[u8]) -> Result<(), AssetStoreError> {
        self.blobs
            .write_image(&asset.id, asset.format, image)
            .await?;

        if let Err(e) = self.repo.put(&asset.id, asset).await {
            if let Err(cleanup) = self.blobs.remove(&asset.id, asset.format).await {
                tracing::warn!(
                    "Failed to clean up blob for {} after metadata write error: {}",
                    asset.id,
                    cleanup
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            "Saved asset {} (v{}, {} bytes)",
            asset.id,
            asset.version,
            image.len()
        );
        Ok(())
    }

    pub async fn save_thumbnail(
        &self,
        id: &str,
        format: AssetFormat,
        bytes: &[u8],
    ) -> Result<(), AssetStoreError> {
        self.blobs.write_thumbnail(id, format, bytes).await?;
        Ok(())
    }

    /// Merge mutable descriptive fields into an existing record and stamp
    /// `updated_at`. Identity and lineage fields cannot be touched through
    /// this path; `UpdateAssetFields` does not carry them.
    pub async fn update_asset(
        &self,
        id: &str,
        fields: &UpdateAssetFields,
    ) -> Result<Asset, AssetStoreError> {
        let mut asset = self.get_asset(id).await?;

        if let Some(name) = &fields.name {
            asset.name = name.clone();
        }
        if let Some(description) = &fields.description {
            asset.description = description.clone();
        }
        if let Some(category) = &fields.category {
            asset.category = category.clone();
        }
        if let Some(generation_prompt) = &fields.generation_prompt {
            asset.generation_prompt = generation_prompt.clone();
        }
        if let Some(tags) = &fields.tags {
            asset.tags = tags.clone();
        }
        if let Some(related_assets) = &fields.related_assets {
            asset.related_assets = related_assets.clone();
        }
        if let Some(used_in_scenes) = &fields.used_in_scenes {
            asset.used_in_scenes = used_in_scenes.clone();
        }
        asset.updated_at = Utc::now();

        self.repo.put(id, &asset).await?;
        Ok(asset)
    }

    /// Replace the stored image of an existing asset and refresh its media
    /// descriptors. Lineage fields are untouched.
    pub async fn replace_image(
        &self,
        id: &str,
        image: &[u8],
        thumbnail: &[u8],
        width: u32,
        height: u32,
        aspect_ratio: String,
    ) -> Result<Asset, AssetStoreError> {
        let mut asset = self.get_asset(id).await?;

        self.blobs.write_image(id, asset.format, image).await?;
        self.blobs
            .write_thumbnail(id, asset.format, thumbnail)
            .await?;

        asset.file_size = image.len() as u64;
        asset.width = width;
        asset.height = height;
        asset.aspect_ratio = aspect_ratio;
        asset.updated_at = Utc::now();

        self.repo.put(id, &asset).await?;
        Ok(asset)
    }

    /// Remove the metadata record. Image and thumbnail file removal is the
    /// caller's responsibility; deleting an id with no record is tolerated.
    pub async fn delete_asset(&self, id: &str) -> Result<(), AssetStoreError> {
        match self.repo.delete(id).await {
            Ok(true) => {
                tracing::info!("Deleted asset metadata for {}", id);
                Ok(())
            }
            Ok(false) => {
                tracing::warn!("Delete requested for unknown asset {}", id);
                Ok(())
            }
            Err(RepositoryError::InvalidKey(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// A project's assets, newest first, optionally narrowed by type.
    pub async fn list_by_project(
        &self,
        project_id: &str,
        asset_type: Option<AssetType>,
    ) -> Result<Vec<Asset>, AssetStoreError> {
        let mut assets: Vec<Asset> = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|a| a.project_id == project_id)
            .filter(|a| asset_type.is_none_or(|t| a.asset_type == t))
            .collect();
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EditHistoryEntry;
    use tempfile::TempDir;

    fn make_asset(id: &str, version: u32, parent: Option<&str>) -> Asset {
        Asset {
            id: id.to_string(),
            asset_type: AssetType::Prop,
            category: "props".into(),
            name: "Space Helmet".into(),
            description: "A weathered helmet".into(),
            generation_prompt: "space helmet".into(),
            provider: "upload".into(),
            project_id: "proj_1".into(),
            tags: vec![],
            related_assets: vec![],
            used_in_scenes: vec![],
            version,
            parent_asset_id: parent.map(str::to_string),
            edit_history: vec![],
            format: AssetFormat::Png,
            aspect_ratio: "1:1".into(),
            width: 512,
            height: 512,
            file_size: 6,
            url: format!("/api/assets/{id}/file"),
            thumbnail_url: format!("/api/assets/{id}/thumbnail"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();
        let asset = make_asset("ast_helmet_1722400000000_a1b2", 1, None);

        store.save_asset(&asset, b"pixels").await.unwrap();

        let loaded = store.get_asset(&asset.id).await.unwrap();
        assert_eq!(loaded, asset);

        let bytes = store.blobs().read_image(&asset.id, asset.format).await.unwrap();
        assert_eq!(bytes, b"pixels");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        let err = store.get_asset("ast_1722400000000_zzzz").await.unwrap_err();
        assert!(matches!(err, AssetStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();
        let asset = make_asset("ast_helmet_1722400000000_a1b2", 1, None);
        store.save_asset(&asset, b"pixels").await.unwrap();

        let updated = store
            .update_asset(
                &asset.id,
                &UpdateAssetFields {
                    name: Some("Gold Helmet".into()),
                    tags: Some(vec!["gold".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Gold Helmet");
        assert_eq!(updated.tags, vec!["gold".to_string()]);
        // Untouched fields survive the merge.
        assert_eq!(updated.description, asset.description);
        assert_eq!(updated.version, 1);
        assert_eq!(updated.parent_asset_id, None);
        assert!(updated.updated_at >= asset.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        let err = store
            .update_asset("ast_1722400000000_zzzz", &UpdateAssetFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AssetStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_destructive_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();
        let asset = make_asset("ast_helmet_1722400000000_a1b2", 1, None);
        store.save_asset(&asset, b"pixels").await.unwrap();

        store.delete_asset(&asset.id).await.unwrap();
        assert!(matches!(
            store.get_asset(&asset.id).await.unwrap_err(),
            AssetStoreError::NotFound(_)
        ));

        // Deleting again must not fail.
        store.delete_asset(&asset.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_metadata_without_blob_is_soft() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();
        let asset = make_asset("ast_helmet_1722400000000_a1b2", 1, None);
        store.save_asset(&asset, b"pixels").await.unwrap();

        // Simulate outside interference with the blob file.
        store.blobs().remove(&asset.id, asset.format).await.unwrap();

        // The record still reads fine; only the blob read reports the gap.
        assert!(store.get_asset(&asset.id).await.is_ok());
        assert!(matches!(
            store.blobs().read_image(&asset.id, asset.format).await.unwrap_err(),
            BlobError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_replace_image_refreshes_media_fields() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();
        let mut asset = make_asset("ast_helmet_1722400000000_a1b2", 2, None);
        asset.edit_history = vec![EditHistoryEntry {
            timestamp: Utc::now(),
            edit_prompt: "make it gold".into(),
            previous_asset_id: "ast_helmet_1722300000000_c3d4".into(),
        }];
        store.save_asset(&asset, b"pixels").await.unwrap();

        let updated = store
            .replace_image(&asset.id, b"new pixel data", b"thumb", 1024, 768, "4:3".into())
            .await
            .unwrap();

        assert_eq!(updated.file_size, 14);
        assert_eq!((updated.width, updated.height), (1024, 768));
        assert_eq!(updated.aspect_ratio, "4:3");
        // Lineage is untouched by an image replacement.
        assert_eq!(updated.version, 2);
        assert_eq!(updated.edit_history.len(), 1);

        let bytes = store.blobs().read_image(&asset.id, asset.format).await.unwrap();
        assert_eq!(bytes, b"new pixel data");
    }

    #[tokio::test]
    async fn test_list_by_project_filters_and_orders() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        let mut first = make_asset("ast_a_1722400000000_a1b2", 1, None);
        first.created_at = Utc::now() - chrono::Duration::hours(1);
        let second = make_asset("ast_b_1722400000001_c3d4", 1, None);
        let mut other_project = make_asset("ast_c_1722400000002_e5f6", 1, None);
        other_project.project_id = "proj_2".into();

        for asset in [&first, &second, &other_project] {
            store.save_asset(asset, b"pixels").await.unwrap();
        }

        let listed = store.list_by_project("proj_1", None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        let props = store
            .list_by_project("proj_1", Some(AssetType::Character))
            .await
            .unwrap();
        assert!(props.is_empty());
    }
}
