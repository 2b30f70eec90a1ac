//! Thumbnail generation and dimension probing over in-memory image bytes.

use std::io::Cursor;

use image::ImageFormat;
use storage::models::AssetFormat;
use thiserror::Error;

/// Longest edge of a generated thumbnail.
pub const THUMBNAIL_EDGE: u32 = 256;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Unreadable image data: {0}")]
    Image(#[from] image::ImageError),
}

/// Stateless image helper shared by the upload and edit flows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbnailService;

impl ThumbnailService {
    pub fn new() -> Self {
        Self
    }

    pub fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), ThumbnailError> {
        let img = image::load_from_memory(bytes)?;
        Ok((img.width(), img.height()))
    }

    /// Downscale to fit `THUMBNAIL_EDGE`, re-encoded in the asset's format.
    pub fn generate(&self, bytes: &[u8], format: AssetFormat) -> Result<Vec<u8>, ThumbnailError> {
        let img = image::load_from_memory(bytes)?;
        let thumb = img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE);

        let mut out = Cursor::new(Vec::new());
        match format {
            // JPEG has no alpha channel.
            AssetFormat::Jpg => {
                image::DynamicImage::ImageRgb8(thumb.to_rgb8())
                    .write_to(&mut out, ImageFormat::Jpeg)?;
            }
            AssetFormat::Png => thumb.write_to(&mut out, ImageFormat::Png)?,
            AssetFormat::Webp => thumb.write_to(&mut out, ImageFormat::WebP)?,
        }
        Ok(out.into_inner())
    }
}

/// Reduced `W:H` form of a pixel size, e.g. 1920x1080 → "16:9".
pub fn aspect_ratio(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return "1:1".to_string();
    }
    let d = gcd(width, height);
    format!("{}:{}", width / d, height / d)
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([40, 90, 200, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_dimensions() {
        let service = ThumbnailService::new();
        assert_eq!(service.dimensions(&png_bytes(64, 48)).unwrap(), (64, 48));
    }

    #[test]
    fn test_dimensions_rejects_garbage() {
        let service = ThumbnailService::new();
        assert!(service.dimensions(b"not an image").is_err());
    }

    #[test]
    fn test_thumbnail_fits_edge_and_keeps_ratio() {
        let service = ThumbnailService::new();
        let thumb = service
            .generate(&png_bytes(1024, 512), AssetFormat::Png)
            .unwrap();

        let (w, h) = service.dimensions(&thumb).unwrap();
        assert_eq!((w, h), (256, 128));
    }

    #[test]
    fn test_thumbnail_jpeg_encodes_without_alpha() {
        let service = ThumbnailService::new();
        let thumb = service
            .generate(&png_bytes(300, 300), AssetFormat::Jpg)
            .unwrap();
        assert!(!thumb.is_empty());
        assert_eq!(service.dimensions(&thumb).unwrap(), (256, 256));
    }

    #[test]
    fn test_aspect_ratio_reduction() {
        assert_eq!(aspect_ratio(1920, 1080), "16:9");
        assert_eq!(aspect_ratio(512, 512), "1:1");
        assert_eq!(aspect_ratio(768, 1024), "3:4");
        assert_eq!(aspect_ratio(0, 100), "1:1");
    }
}
