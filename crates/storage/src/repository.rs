use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("Invalid record key: {0}")]
    InvalidKey(String),
}

/// Keyed JSON-document persistence.
///
/// The asset store talks to this interface only, so the record set can live
/// on a local disk, an embedded key-value store, or a remote object store
/// without the facade or the lineage walker knowing about paths.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Serialize + DeserializeOwned,
{
    async fn get(&self, key: &str) -> Result<Option<T>, RepositoryError>;
    async fn put(&self, key: &str, record: &T) -> Result<(), RepositoryError>;
    /// Returns whether a record existed under `key`.
    async fn delete(&self, key: &str) -> Result<bool, RepositoryError>;
    async fn list(&self) -> Result<Vec<T>, RepositoryError>;
}

/// Filesystem-backed repository: one pretty-printed JSON document per key
/// under a single directory.
pub struct FsRepository<T> {
    root: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> FsRepository<T> {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            _record: PhantomData,
        })
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, RepositoryError> {
        // Keys become file names; anything outside the id alphabet could
        // escape the root directory.
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(RepositoryError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl<T> Repository<T> for FsRepository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let path = self.record_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).await?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn put(&self, key: &str, record: &T) -> Result<(), RepositoryError> {
        let path = self.record_path(key)?;
        let raw = serde_json::to_string_pretty(record)?;
        fs::write(path, raw).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, RepositoryError> {
        let path = self.record_path(key)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read_to_string(&path).await?;
            match serde_json::from_str(&raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // A single corrupt document must not take down listing.
                    tracing::warn!("Skipping unreadable record {}: {}", path.display(), e);
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        id: String,
        note: String,
    }

    fn doc(id: &str) -> Doc {
        Doc {
            id: id.to_string(),
            note: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let repo: FsRepository<Doc> = FsRepository::new(dir.path()).unwrap();

        repo.put("ast_1722400000000_a1b2", &doc("ast_1722400000000_a1b2"))
            .await
            .unwrap();
        let loaded = repo.get("ast_1722400000000_a1b2").await.unwrap();
        assert_eq!(loaded, Some(doc("ast_1722400000000_a1b2")));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let repo: FsRepository<Doc> = FsRepository::new(dir.path()).unwrap();
        assert!(repo.get("ast_1722400000000_zzzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let dir = TempDir::new().unwrap();
        let repo: FsRepository<Doc> = FsRepository::new(dir.path()).unwrap();

        repo.put("ast_1722400000000_a1b2", &doc("x")).await.unwrap();
        assert!(repo.delete("ast_1722400000000_a1b2").await.unwrap());
        assert!(!repo.delete("ast_1722400000000_a1b2").await.unwrap());
    }

    #[tokio::test]
    async fn test_key_escaping_rejected() {
        let dir = TempDir::new().unwrap();
        let repo: FsRepository<Doc> = FsRepository::new(dir.path()).unwrap();

        let err = repo.get("../escape").await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        let repo: FsRepository<Doc> = FsRepository::new(dir.path()).unwrap();

        repo.put("ast_1722400000000_a1b2", &doc("x")).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let records = repo.list().await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
