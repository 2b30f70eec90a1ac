pub mod asset;

pub use asset::{Asset, AssetFormat, AssetType, EditHistoryEntry, UpdateAssetFields};
