use crate::{
    models::Asset,
    store::{AssetStore, AssetStoreError},
};

/// Hard ceiling on a reconstructed chain. Nothing prevents a corrupt parent
/// pointer from forming a cycle, so the walk must be bounded.
pub const MAX_CHAIN_LEN: usize = 100;

/// Why a lineage walk stopped before reaching a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    /// A parent id pointed at a record that no longer exists.
    MissingParent,
    /// The chain hit `MAX_CHAIN_LEN`; a cycle is the likely cause.
    ChainTooLong,
}

/// The reconstructed version chain for one asset, ordered oldest → newest.
#[derive(Debug)]
pub struct Lineage {
    pub chain: Vec<Asset>,
    /// Version of the asset the walk was requested for (which may not be the
    /// newest version in existence).
    pub current_version: u32,
    pub truncation: Option<Truncation>,
}

impl Lineage {
    pub fn total_versions(&self) -> usize {
        self.chain.len()
    }
}

/// Reconstruct the version chain of `id` by following `parent_asset_id`
/// references backward.
///
/// A missing requested asset is fatal. A missing intermediate parent is not:
/// the walk stops and the chain collected so far is returned, flagged as
/// truncated. The same applies when the chain exceeds `MAX_CHAIN_LEN`.
pub async fn walk_lineage(store: &AssetStore, id: &str) -> Result<Lineage, AssetStoreError> {
    let requested = store.get_asset(id).await?;
    let current_version = requested.version;

    let mut next_parent = requested.parent_asset_id.clone();
    let mut chain = vec![requested];
    let mut truncation = None;

    while let Some(parent_id) = next_parent {
        if chain.len() >= MAX_CHAIN_LEN {
            tracing::warn!(
                "Lineage for {} exceeds {} entries, aborting walk (cycle suspected)",
                id,
                MAX_CHAIN_LEN
            );
            truncation = Some(Truncation::ChainTooLong);
            break;
        }

        match store.try_get_asset(&parent_id).await? {
            Some(parent) => {
                next_parent = parent.parent_asset_id.clone();
                chain.insert(0, parent);
            }
            None => {
                tracing::warn!(
                    "Lineage for {} truncated: parent {} no longer exists",
                    id,
                    parent_id
                );
                truncation = Some(Truncation::MissingParent);
                break;
            }
        }
    }

    Ok(Lineage {
        chain,
        current_version,
        truncation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetFormat, AssetType, EditHistoryEntry};
    use chrono::Utc;
    use tempfile::TempDir;

    fn make_asset(id: &str, version: u32, parent: Option<&str>) -> Asset {
        Asset {
            id: id.to_string(),
            asset_type: AssetType::Prop,
            category: "props".into(),
            name: "Space Helmet".into(),
            description: String::new(),
            generation_prompt: "space helmet".into(),
            provider: "upload".into(),
            project_id: "proj_1".into(),
            tags: vec![],
            related_assets: vec![],
            used_in_scenes: vec![],
            version,
            parent_asset_id: parent.map(str::to_string),
            edit_history: (1..version)
                .map(|v| EditHistoryEntry {
                    timestamp: Utc::now(),
                    edit_prompt: format!("edit {v}"),
                    previous_asset_id: format!("ast_v{v}_1722400000000_a1b2"),
                })
                .collect(),
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

    async fn seed(store: &AssetStore, asset: &Asset) {
        store.save_asset(asset, b"pixels").await.unwrap();
    }

    #[tokio::test]
    async fn test_walk_full_chain_oldest_first() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        let v1 = make_asset("ast_v1_1722400000000_a1b2", 1, None);
        let v2 = make_asset("ast_v2_1722400000001_c3d4", 2, Some(&v1.id));
        let v3 = make_asset("ast_v3_1722400000002_e5f6", 3, Some(&v2.id));
        for asset in [&v1, &v2, &v3] {
            seed(&store, asset).await;
        }

        let lineage = walk_lineage(&store, &v3.id).await.unwrap();
        assert_eq!(lineage.total_versions(), 3);
        assert_eq!(lineage.current_version, 3);
        assert_eq!(lineage.truncation, None);

        let versions: Vec<u32> = lineage.chain.iter().map(|a| a.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(lineage.chain[0].id, v1.id);
        assert_eq!(lineage.chain[2].id, v3.id);
    }

    #[tokio::test]
    async fn test_walk_from_middle_version() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        let v1 = make_asset("ast_v1_1722400000000_a1b2", 1, None);
        let v2 = make_asset("ast_v2_1722400000001_c3d4", 2, Some(&v1.id));
        let v3 = make_asset("ast_v3_1722400000002_e5f6", 3, Some(&v2.id));
        for asset in [&v1, &v2, &v3] {
            seed(&store, asset).await;
        }

        // Walking a non-latest version ends at that version.
        let lineage = walk_lineage(&store, &v2.id).await.unwrap();
        assert_eq!(lineage.total_versions(), 2);
        assert_eq!(lineage.current_version, 2);
        assert_eq!(lineage.chain[1].id, v2.id);
    }

    #[tokio::test]
    async fn test_missing_requested_asset_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        let err = walk_lineage(&store, "ast_1722400000000_zzzz").await.unwrap_err();
        assert!(matches!(err, AssetStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_parent_truncates_instead_of_failing() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        let v1 = make_asset("ast_v1_1722400000000_a1b2", 1, None);
        let v2 = make_asset("ast_v2_1722400000001_c3d4", 2, Some(&v1.id));
        let v3 = make_asset("ast_v3_1722400000002_e5f6", 3, Some(&v2.id));
        for asset in [&v1, &v2, &v3] {
            seed(&store, asset).await;
        }
        store.delete_asset(&v1.id).await.unwrap();

        let lineage = walk_lineage(&store, &v3.id).await.unwrap();
        assert_eq!(lineage.truncation, Some(Truncation::MissingParent));
        // Chain starts from the oldest reachable ancestor.
        assert_eq!(lineage.total_versions(), 2);
        assert_eq!(lineage.chain[0].id, v2.id);
        assert_eq!(lineage.chain[1].id, v3.id);
    }

    #[tokio::test]
    async fn test_cycle_is_bounded() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).unwrap();

        // Corrupt state: two records pointing at each other. The facade does
        // not re-validate parent pointers on save, so the walker must cope.
        let a = make_asset("ast_a_1722400000000_a1b2", 1, Some("ast_b_1722400000001_c3d4"));
        let b = make_asset("ast_b_1722400000001_c3d4", 2, Some("ast_a_1722400000000_a1b2"));
        seed(&store, &a).await;
        seed(&store, &b).await;

        let lineage = walk_lineage(&store, &a.id).await.unwrap();
        assert_eq!(lineage.truncation, Some(Truncation::ChainTooLong));
        assert_eq!(lineage.total_versions(), MAX_CHAIN_LEN);
    }
}
