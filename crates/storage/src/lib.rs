pub mod asset_id;
pub mod blob;
pub mod lineage;
pub mod models;
pub mod repository;
pub mod store;

pub use blob::{BlobError, BlobStore};
pub use lineage::{Lineage, Truncation, walk_lineage};
pub use repository::{FsRepository, Repository, RepositoryError};
pub use store::{AssetStore, AssetStoreError};
