use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::utils::ExtractionError;

/// Where the holder's photograph sits on the card, as fractions of the
/// card's width and height, and how the crop is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortraitConfig {
    pub x_start: f32,
    pub x_end: f32,
    pub y_start: f32,
    pub y_end: f32,
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
}

impl Default for PortraitConfig {
    fn default() -> Self {
        PortraitConfig {
            x_start: 0.02,
            x_end: 0.25,
            y_start: 0.25,
            y_end: 0.75,
            width: 150,
            height: 200,
            jpeg_quality: 85,
        }
    }
}

pub struct PortraitExtractor;

impl PortraitExtractor {
    /// Crop the fixed photo region, resize it and encode it as JPEG. No face
    /// detection is attempted.
    pub fn extract(img: &DynamicImage, config: &PortraitConfig) -> Result<Vec<u8>, ExtractionError> {
        let (width, height) = (img.width(), img.height());
        let x0 = scale(width, config.x_start);
        let x1 = scale(width, config.x_end);
        let y0 = scale(height, config.y_start);
        let y1 = scale(height, config.y_end);

        if x1 <= x0 || y1 <= y0 {
            return Err(ExtractionError::PortraitError(format!(
                "Empty crop region ({}..{} x {}..{}) on a {}x{} image",
                x0, x1, y0, y1, width, height
            )));
        }
        if config.width == 0 || config.height == 0 {
            return Err(ExtractionError::PortraitError(format!(
                "Invalid portrait size {}x{}",
                config.width, config.height
            )));
        }

        let crop = img.crop_imm(x0, y0, x1 - x0, y1 - y0);
        let resized = crop.resize_exact(config.width, config.height, FilterType::Lanczos3);
        debug!(
            "Portrait crop {}x{} at ({}, {}) resized to {}x{}",
            x1 - x0,
            y1 - y0,
            x0,
            y0,
            config.width,
            config.height
        );

        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(resized.to_rgb8())
            .write_to(
                &mut Cursor::new(&mut buffer),
                ImageOutputFormat::Jpeg(config.jpeg_quality),
            )
            .map_err(|e| ExtractionError::ImageEncodeError(format!("Failed to encode portrait: {}", e)))?;
        Ok(buffer)
    }
}

fn scale(extent: u32, fraction: f32) -> u32 {
    ((extent as f32 * fraction.clamp(0.0, 1.0)) as u32).min(extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_portrait_is_resized_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 250, Rgb([120, 80, 60])));
        let bytes = PortraitExtractor::extract(&img, &PortraitConfig::default()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (150, 200));
    }

    #[test]
    fn test_tiny_image_has_no_crop_region() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(3, 3));
        let err = PortraitExtractor::extract(&img, &PortraitConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::PortraitError(_)));
    }

    #[test]
    fn test_custom_region() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let config = PortraitConfig {
            x_start: 0.5,
            x_end: 1.0,
            y_start: 0.0,
            y_end: 0.5,
            width: 32,
            height: 16,
            ..Default::default()
        };
        let bytes = PortraitExtractor::extract(&img, &config).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }
}
