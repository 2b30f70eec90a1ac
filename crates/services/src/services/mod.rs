pub mod asset_editor;
pub mod image_edit;
pub mod thumbnails;
