use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::models::AssetFormat;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Image file not found for asset {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Binary image + thumbnail persistence keyed by asset id and format.
///
/// Layout: `{root}/{id}.{ext}` for the image, `{root}/{id}.thumb.{ext}` for
/// the thumbnail. Coordination with the metadata record is the facade's job.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn image_path(&self, id: &str, format: AssetFormat) -> PathBuf {
        self.root.join(format!("{id}.{}", format.extension()))
    }

    pub fn thumbnail_path(&self, id: &str, format: AssetFormat) -> PathBuf {
        self.root.join(format!("{id}.thumb.{}", format.extension()))
    }

    pub async fn write_image(
        &self,
        id: &str,
        format: AssetFormat,
        bytes: &[u8],
    ) -> Result<(), BlobError> {
        fs::write(self.image_path(id, format), bytes).await?;
        tracing::debug!("Wrote image blob for {} ({} bytes)", id, bytes.len());
        Ok(())
    }

    pub async fn write_thumbnail(
        &self,
        id: &str,
        format: AssetFormat,
        bytes: &[u8],
    ) -> Result<(), BlobError> {
        fs::write(self.thumbnail_path(id, format), bytes).await?;
        Ok(())
    }

    pub async fn read_image(&self, id: &str, format: AssetFormat) -> Result<Vec<u8>, BlobError> {
        Self::read(self.image_path(id, format), id).await
    }

    pub async fn read_thumbnail(
        &self,
        id: &str,
        format: AssetFormat,
    ) -> Result<Vec<u8>, BlobError> {
        Self::read(self.thumbnail_path(id, format), id).await
    }

    async fn read(path: PathBuf, id: &str) -> Result<Vec<u8>, BlobError> {
        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(id.to_string())
            } else {
                e.into()
            }
        })
    }

    pub async fn image_exists(&self, id: &str, format: AssetFormat) -> bool {
        self.image_path(id, format).exists()
    }

    /// Remove the image and its thumbnail. Missing files are not an error,
    /// so cleanup can be retried and interleaved with metadata deletion.
    pub async fn remove(&self, id: &str, format: AssetFormat) -> Result<(), BlobError> {
        for path in [self.image_path(id, format), self.thumbnail_path(id, format)] {
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
