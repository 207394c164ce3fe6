use image::DynamicImage;
use log::{debug, error, info, warn};

use crate::config::ExtractorConfig;
use crate::models::{ExtractionResult, Field};
use crate::processing::{
    CorrectionTables, EnsembleVoter, FieldExtractor, ImageProcessor, PortraitExtractor,
    RecognitionEngine, RecognitionPassRunner, TesseractEngine,
};
use crate::utils::ExtractionError;
use crate::validation::FormatValidator;

/// The engine's single entry point: image bytes in, structured record out.
pub struct IdentityExtractor<E: RecognitionEngine = TesseractEngine> {
    engine: E,
    tables: CorrectionTables,
    config: ExtractorConfig,
}

impl IdentityExtractor<TesseractEngine> {
    pub fn with_tesseract(config: ExtractorConfig) -> Self {
        let engine = TesseractEngine::new(config.tessdata_path.clone(), config.language.clone());
        IdentityExtractor::new(engine, config)
    }
}

impl<E: RecognitionEngine> IdentityExtractor<E> {
    pub fn new(engine: E, config: ExtractorConfig) -> Self {
        IdentityExtractor {
            engine,
            tables: CorrectionTables::default(),
            config,
        }
    }

    pub fn with_tables(mut self, tables: CorrectionTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Never fails: problems are reported through `success` and `error`.
    pub fn extract(&self, image_bytes: &[u8], use_ensemble: bool) -> ExtractionResult {
        match self.try_extract(image_bytes, use_ensemble) {
            Ok(result) => result,
            Err(e) => {
                error!("Extraction failed: {}", e);
                ExtractionResult::failed(e)
            }
        }
    }

    pub fn try_extract(
        &self,
        image_bytes: &[u8],
        use_ensemble: bool,
    ) -> Result<ExtractionResult, ExtractionError> {
        self.check_input(image_bytes)?;
        let img = ImageProcessor::decode(image_bytes)?;
        info!(
            "Decoded {}x{} image ({} bytes), ensemble {}",
            img.width(),
            img.height(),
            image_bytes.len(),
            if use_ensemble { "on" } else { "off" }
        );

        let portrait = match PortraitExtractor::extract(&img, &self.config.portrait) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("No portrait: {}", e);
                None
            }
        };

        let raw_text = self.recognize_text(&img, use_ensemble)?;
        info!("Combined text: {} characters", raw_text.len());

        let fields = FieldExtractor::new(&self.tables, &self.config.rules).extract_fields(&raw_text);
        let validator = FormatValidator::new(&self.config.rules);
        let checked = |field: Field, value: Option<String>| {
            value.filter(|v| {
                let valid = validator.validate_field(field, v);
                if !valid {
                    debug!("Dropped invalid {} {:?}", field, v);
                }
                valid
            })
        };

        let secondary_name = checked(Field::SecondaryName, fields.secondary_name);
        let result = ExtractionResult {
            document_number: checked(Field::DocumentNumber, fields.document_number),
            primary_name: checked(Field::PrimaryName, fields.primary_name),
            secondary_name_inferred: secondary_name.is_some() && fields.secondary_name_inferred,
            secondary_name,
            date_of_birth: checked(Field::DateOfBirth, fields.date_of_birth),
            portrait,
            raw_text,
            success: true,
            error: None,
        };

        let completeness = result.completeness();
        info!(
            "Found {}/{} fields: {}",
            completeness.found,
            completeness.total,
            result.status_message()
        );
        Ok(result)
    }

    pub fn extract_portrait(&self, image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
        self.check_input(image_bytes)?;
        let img = ImageProcessor::decode(image_bytes)?;
        PortraitExtractor::extract(&img, &self.config.portrait)
    }

    fn check_input(&self, image_bytes: &[u8]) -> Result<(), ExtractionError> {
        if image_bytes.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        if image_bytes.len() > self.config.max_image_bytes {
            return Err(ExtractionError::InputTooLarge {
                size: image_bytes.len(),
                limit: self.config.max_image_bytes,
            });
        }
        Ok(())
    }

    /// Ensemble vote first when asked for, then the full variant sweep, then
    /// the ensemble as a last resort if it has not run yet. Only when every
    /// pass on every path has raised does recognition fail.
    fn recognize_text(&self, img: &DynamicImage, use_ensemble: bool) -> Result<String, ExtractionError> {
        let mut attempted = 0;
        let mut succeeded = 0;
        let mut ensemble_tried = false;

        if use_ensemble {
            let outcome = EnsembleVoter::run(&self.engine, img, self.config.ensemble_runs)?;
            ensemble_tried = true;
            attempted += outcome.attempted;
            succeeded += outcome.succeeded();
            if !outcome.text.trim().is_empty() {
                return Ok(outcome.text);
            }
            info!("Ensemble produced no text, falling back to the full sweep");
        }

        let variants = ImageProcessor::variants(img);
        let sweep = RecognitionPassRunner::sweep(&self.engine, &variants)?;
        attempted += sweep.attempted;
        succeeded += sweep.succeeded();
        if !sweep.texts.is_empty() {
            return Ok(sweep.combined_text());
        }

        if !ensemble_tried {
            warn!(
                "Sweep produced no text ({} of {} passes failed), trying ensemble recognition",
                sweep.failed, sweep.attempted
            );
            let outcome = EnsembleVoter::run(&self.engine, img, self.config.ensemble_runs)?;
            attempted += outcome.attempted;
            succeeded += outcome.succeeded();
            if !outcome.text.trim().is_empty() {
                return Ok(outcome.text);
            }
        }

        if succeeded > 0 {
            Ok(String::new())
        } else {
            Err(ExtractionError::RecognitionExhausted { attempted })
        }
    }
}
