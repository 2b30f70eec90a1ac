use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a visual element within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Character,
    Prop,
    Location,
    Effect,
    Storyboard,
}

impl AssetType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "character" => Some(AssetType::Character),
            "prop" => Some(AssetType::Prop),
            "location" => Some(AssetType::Location),
            "effect" => Some(AssetType::Effect),
            "storyboard" => Some(AssetType::Storyboard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Character => "character",
            AssetType::Prop => "prop",
            AssetType::Location => "location",
            AssetType::Effect => "effect",
            AssetType::Storyboard => "storyboard",
        }
    }

    /// Pluralized form used to sub-partition storage and galleries.
    pub fn category(&self) -> &'static str {
        match self {
            AssetType::Character => "characters",
            AssetType::Prop => "props",
            AssetType::Location => "locations",
            AssetType::Effect => "effects",
            AssetType::Storyboard => "storyboards",
        }
    }
}

/// On-disk encoding of the image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    Png,
    Jpg,
    Webp,
}

impl AssetFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(AssetFormat::Png),
            "image/jpeg" | "image/jpg" => Some(AssetFormat::Jpg),
            "image/webp" => Some(AssetFormat::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AssetFormat::Png => "png",
            AssetFormat::Jpg => "jpg",
            AssetFormat::Webp => "webp",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            AssetFormat::Png => "image/png",
            AssetFormat::Jpg => "image/jpeg",
            AssetFormat::Webp => "image/webp",
        }
    }
}

/// One edit that produced a new version in the same chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub edit_prompt: String,
    pub previous_asset_id: String,
}

/// One version of a generated or uploaded visual element.
///
/// Lineage fields (`version`, `parent_asset_id`, `edit_history`) are
/// write-once per record: edits mint a new `Asset` rather than mutating the
/// existing one. A root asset has `parent_asset_id == None`, `version == 1`
/// and an empty history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub category: String,
    pub name: String,
    pub description: String,
    pub generation_prompt: String,
    /// Source system that produced the pixels, or "upload" / "ai-edited".
    pub provider: String,
    pub project_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_assets: Vec<String>,
    #[serde(default)]
    pub used_in_scenes: Vec<String>,
    pub version: u32,
    pub parent_asset_id: Option<String>,
    #[serde(default)]
    pub edit_history: Vec<EditHistoryEntry>,
    pub format: AssetFormat,
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub url: String,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn is_root(&self) -> bool {
        self.parent_asset_id.is_none()
    }
}

/// Mutable descriptive fields accepted by `AssetStore::update_asset`.
///
/// Identity and lineage fields are deliberately absent: an update can never
/// change `id`, `parent_asset_id` or `version`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub generation_prompt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related_assets: Option<Vec<String>>,
    pub used_in_scenes: Option<Vec<String>>,
}

impl UpdateAssetFields {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.generation_prompt.is_none()
            && self.tags.is_none()
            && self.related_assets.is_none()
            && self.used_in_scenes.is_none()
    }
}
