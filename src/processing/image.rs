use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::contrast::{adaptive_threshold, otsu_level, threshold};
use imageproc::filter::{median_filter, sharpen3x3};
use log::debug;

use super::ocr::PreprocessedImage;
use crate::utils::ExtractionError;

/// Mean luma below which an image counts as under-exposed.
const DARK_MEAN_LUMA: f32 = 150.0;
const TARGET_MEAN_LUMA: f32 = 200.0;
const MAX_BRIGHTNESS_GAIN: f32 = 4.0;
const DARK_CONTRAST_BOOST: f32 = 1.8;

const ADAPTIVE_BLOCK_RADIUS: u32 = 5;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn decode(image_bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
        image::load_from_memory(image_bytes)
            .map_err(|e| ExtractionError::ImageDecodeError(format!("Failed to load image: {}", e)))
    }

    /// The renditions every recognition sweep runs over, each already
    /// brightness-normalised.
    pub fn variants(img: &DynamicImage) -> Vec<PreprocessedImage> {
        let gray = img.to_luma8();

        let otsu = threshold(&gray, otsu_level(&gray));
        let denoised = adaptive_threshold(&median_filter(&gray, 1, 1), ADAPTIVE_BLOCK_RADIUS);

        let variants = vec![
            ("original", img.clone()),
            ("contrast", Self::enhance_contrast(img, 2.0)),
            ("sharpened", DynamicImage::ImageLuma8(sharpen3x3(&gray))),
            ("otsu", DynamicImage::ImageLuma8(otsu)),
            ("adaptive", DynamicImage::ImageLuma8(denoised)),
            (
                "brightened",
                Self::enhance_contrast(&Self::enhance_brightness(img, 1.5), 1.5),
            ),
        ];

        variants
            .into_iter()
            .map(|(label, variant)| PreprocessedImage::new(label, Self::normalize_brightness(&variant)))
            .collect()
    }

    pub fn mean_luma(img: &DynamicImage) -> f32 {
        Self::mean_gray(&img.to_luma8())
    }

    fn mean_gray(gray: &GrayImage) -> f32 {
        let count = gray.width() as u64 * gray.height() as u64;
        if count == 0 {
            return 0.0;
        }
        let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
        sum as f32 / count as f32
    }

    /// Lift dark photographs towards a mean luma of 200, then boost contrast.
    /// Images that are already bright enough are returned unchanged.
    pub fn normalize_brightness(img: &DynamicImage) -> DynamicImage {
        let mean = Self::mean_luma(img);
        if mean >= DARK_MEAN_LUMA {
            return img.clone();
        }

        let gain = (TARGET_MEAN_LUMA / (mean + 1.0)).min(MAX_BRIGHTNESS_GAIN);
        debug!("Dark image (mean luma {:.1}), brightness x{:.2}", mean, gain);
        Self::enhance_contrast(&Self::enhance_brightness(img, gain), DARK_CONTRAST_BOOST)
    }

    /// Scale every channel by `factor`.
    pub fn enhance_brightness(img: &DynamicImage, factor: f32) -> DynamicImage {
        let mut rgb: RgbImage = img.to_rgb8();
        for pixel in rgb.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                *channel = clamp_channel(*channel as f32 * factor);
            }
        }
        DynamicImage::ImageRgb8(rgb)
    }

    /// Push channels away from the image's mean gray level by `factor`.
    pub fn enhance_contrast(img: &DynamicImage, factor: f32) -> DynamicImage {
        let mean = Self::mean_luma(img);
        let mut rgb: RgbImage = img.to_rgb8();
        for pixel in rgb.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                *channel = clamp_channel(mean + (*channel as f32 - mean) * factor);
            }
        }
        DynamicImage::ImageRgb8(rgb)
    }
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn flat(value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([value, value, value])))
    }

    #[test]
    fn test_decode_round_trip_and_garbage() {
        let mut bytes = Vec::new();
        flat(90)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        let decoded = ImageProcessor::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));

        let err = ImageProcessor::decode(b"not an image").unwrap_err();
        assert!(matches!(err, ExtractionError::ImageDecodeError(_)));
    }

    #[test]
    fn test_bright_image_left_alone() {
        let img = flat(180);
        let normalized = ImageProcessor::normalize_brightness(&img);
        assert_eq!(normalized.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn test_dark_image_is_lifted() {
        let img = flat(40);
        let normalized = ImageProcessor::normalize_brightness(&img);
        assert!(ImageProcessor::mean_luma(&normalized) > 150.0);

        // Gain is capped at 4x
        let black = ImageProcessor::normalize_brightness(&flat(10));
        assert_eq!(black.to_rgb8().get_pixel(0, 0)[0], 40);
    }

    #[test]
    fn test_six_variants_same_size() {
        let mut img = RgbImage::from_pixel(40, 30, Rgb([200, 200, 200]));
        for x in 10..30 {
            img.put_pixel(x, 15, Rgb([20, 20, 20]));
        }
        let variants = ImageProcessor::variants(&DynamicImage::ImageRgb8(img));
        let labels: Vec<&str> = variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["original", "contrast", "sharpened", "otsu", "adaptive", "brightened"]
        );
        assert!(variants
            .iter()
            .all(|v| v.image.width() == 40 && v.image.height() == 30));
    }
}
