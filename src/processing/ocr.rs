use image::{DynamicImage, ImageOutputFormat};
use log::{debug, error, info, warn};
use std::io::Write;
use tesseract::Tesseract;

use crate::models::RecognitionAttempt;
use crate::utils::ExtractionError;

/// Characters the restricted passes may emit.
pub const CARD_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789/- ";

// TSV columns: level page block par line word left top width height conf text
const TSV_CONFIDENCE_COLUMN: usize = 10;

/// One pre-processed rendition of the input image.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub label: String,
    pub image: DynamicImage,
}

impl PreprocessedImage {
    pub fn new(label: impl Into<String>, image: DynamicImage) -> Self {
        PreprocessedImage {
            label: label.into(),
            image,
        }
    }
}

/// Page-segmentation mode plus optional character whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub page_seg_mode: u8,
    pub whitelist: Option<String>,
}

impl RecognitionConfig {
    pub fn new(page_seg_mode: u8, whitelist: Option<&str>) -> Self {
        RecognitionConfig {
            page_seg_mode,
            whitelist: whitelist.map(str::to_string),
        }
    }

    /// Modes 6, 3 and 11, each without and then with the card whitelist.
    pub fn sweep() -> Vec<RecognitionConfig> {
        [6, 3, 11]
            .iter()
            .flat_map(|&psm| {
                [
                    RecognitionConfig::new(psm, None),
                    RecognitionConfig::new(psm, Some(CARD_WHITELIST)),
                ]
            })
            .collect()
    }
}

impl Default for RecognitionConfig {
    /// Fully automatic page segmentation, no whitelist. Used for ensemble runs.
    fn default() -> Self {
        RecognitionConfig::new(3, None)
    }
}

/// What the engine reports for one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecognition {
    pub text: String,
    /// Per-token scores, -1 where the engine has none.
    pub token_confidences: Vec<i32>,
}

impl From<RawRecognition> for RecognitionAttempt {
    fn from(raw: RawRecognition) -> Self {
        RecognitionAttempt::from_tokens(raw.text, &raw.token_confidences)
    }
}

/// The external text-recognition engine.
pub trait RecognitionEngine {
    fn recognize(
        &self,
        image: &PreprocessedImage,
        config: &RecognitionConfig,
    ) -> Result<RawRecognition, ExtractionError>;
}

/// Tesseract-backed engine. Each pass hands the image to Tesseract through a
/// temporary PNG that is removed when the pass ends.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    datapath: Option<String>,
    language: String,
}

impl TesseractEngine {
    pub fn new(datapath: Option<String>, language: impl Into<String>) -> Self {
        TesseractEngine {
            datapath,
            language: language.into(),
        }
    }

    fn parse_tsv_confidences(tsv: &str) -> Vec<i32> {
        tsv.lines()
            .filter_map(|row| {
                let columns: Vec<&str> = row.split('\t').collect();
                // Only word rows carry text
                if columns.len() <= TSV_CONFIDENCE_COLUMN + 1
                    || columns[TSV_CONFIDENCE_COLUMN + 1].trim().is_empty()
                {
                    return None;
                }
                columns[TSV_CONFIDENCE_COLUMN]
                    .trim()
                    .parse::<f32>()
                    .ok()
                    .map(|conf| conf.round() as i32)
            })
            .collect()
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize(
        &self,
        image: &PreprocessedImage,
        config: &RecognitionConfig,
    ) -> Result<RawRecognition, ExtractionError> {
        let mut temp_file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractionError::RecognitionError(format!("Failed to create temp file: {}", e)))?;

        image
            .image
            .write_to(temp_file.as_file_mut(), ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageEncodeError(e.to_string()))?;
        temp_file.flush()?;

        let image_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| ExtractionError::RecognitionError("Temp path is not valid UTF-8".to_string()))?;

        let tess = Tesseract::new(self.datapath.as_deref(), Some(self.language.as_str()))
            .map_err(|e| ExtractionError::RecognitionError(format!("Tesseract init error: {}", e)))?
            .set_image(image_path)
            .map_err(|e| ExtractionError::RecognitionError(format!("Tesseract set image error: {}", e)))?
            .set_variable("tessedit_pageseg_mode", &config.page_seg_mode.to_string())
            .map_err(|e| ExtractionError::RecognitionError(format!("Tesseract set variable error: {}", e)))?;

        let mut tess = match &config.whitelist {
            Some(whitelist) => tess
                .set_variable("tessedit_char_whitelist", whitelist)
                .map_err(|e| ExtractionError::RecognitionError(format!("Tesseract set variable error: {}", e)))?,
            None => tess,
        };

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::RecognitionError(format!("Tesseract error: {}", e)))?;

        let token_confidences = match tess.get_tsv_text(0) {
            Ok(tsv) => Self::parse_tsv_confidences(&tsv),
            Err(e) => {
                debug!("TSV output unavailable ({}), using mean confidence", e);
                vec![tess.mean_text_conf()]
            }
        };

        Ok(RawRecognition {
            text,
            token_confidences,
        })
    }
}

/// Texts gathered by a full sweep, with pass accounting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepOutcome {
    pub texts: Vec<String>,
    pub attempted: usize,
    pub failed: usize,
}

impl SweepOutcome {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }

    /// All non-empty outputs joined into one blob.
    pub fn combined_text(&self) -> String {
        self.texts.join("\n")
    }
}

pub struct RecognitionPassRunner;

impl RecognitionPassRunner {
    /// Run every variant under every sweep configuration once. A pass that
    /// fails recoverably is logged and skipped; any other error ends the
    /// sweep.
    pub fn sweep<E: RecognitionEngine + ?Sized>(
        engine: &E,
        variants: &[PreprocessedImage],
    ) -> Result<SweepOutcome, ExtractionError> {
        let configs = RecognitionConfig::sweep();
        let mut outcome = SweepOutcome::default();

        for variant in variants {
            for config in &configs {
                outcome.attempted += 1;
                match engine.recognize(variant, config) {
                    Ok(raw) => {
                        let text = raw.text.trim();
                        if !text.is_empty() {
                            outcome.texts.push(text.to_string());
                        }
                    }
                    Err(e) if !e.is_recoverable() => {
                        error!(
                            "Aborting sweep at variant {}, psm {}: {}",
                            variant.label, config.page_seg_mode, e
                        );
                        return Err(e);
                    }
                    Err(e) => {
                        outcome.failed += 1;
                        warn!(
                            "Recognition pass failed (variant {}, psm {}, whitelist {}): {}",
                            variant.label,
                            config.page_seg_mode,
                            config.whitelist.is_some(),
                            e
                        );
                    }
                }
            }
        }

        info!(
            "Sweep finished: {} of {} passes succeeded, {} non-empty texts",
            outcome.succeeded(),
            outcome.attempted,
            outcome.texts.len()
        );
        Ok(outcome)
    }
}
