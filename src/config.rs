use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::models::ExtractionRules;
use crate::processing::PortraitConfig;
use crate::utils::ExtractionError;

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Runtime settings for an `IdentityExtractor`. Every field has a default,
/// so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub language: String,
    pub tessdata_path: Option<String>,
    pub ensemble_runs: usize,
    pub max_image_bytes: usize,
    pub portrait: PortraitConfig,
    pub rules: ExtractionRules,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            language: "eng".to_string(),
            tessdata_path: std::env::var("TESSDATA_PREFIX").ok(),
            ensemble_runs: 3,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            portrait: PortraitConfig::default(),
            rules: ExtractionRules::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractionError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ExtractionError> {
        let config: ExtractorConfig = serde_json::from_str(json)
            .map_err(|e| ExtractionError::ConfigError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.ensemble_runs == 0 {
            return Err(ExtractionError::ConfigError(
                "ensemble_runs must be at least 1".to_string(),
            ));
        }
        if self.max_image_bytes == 0 {
            return Err(ExtractionError::ConfigError(
                "max_image_bytes must be positive".to_string(),
            ));
        }
        if self.rules.min_birth_year > self.rules.max_birth_year {
            return Err(ExtractionError::ConfigError(format!(
                "Birth year range {}..{} is empty",
                self.rules.min_birth_year, self.rules.max_birth_year
            )));
        }
        Ok(())
    }
}
