use thiserror::Error;

use crate::models::Field;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),
    #[error("Image encode error: {0}")]
    ImageEncodeError(String),
    #[error("Recognition error: {0}")]
    RecognitionError(String),
    #[error("Recognition failed: all {attempted} passes raised errors")]
    RecognitionExhausted { attempted: usize },
    #[error("Invalid {field} candidate: {value}")]
    InvalidCandidate { field: Field, value: String },
    #[error("Portrait extraction error: {0}")]
    PortraitError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Input too large: {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },
    #[error("Empty input: no image bytes supplied")]
    EmptyInput,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExtractionError {
    /// Errors raised by a single recognition pass. These are skipped rather
    /// than aborting the whole extraction.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExtractionError::RecognitionError(_) | ExtractionError::InvalidCandidate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(ExtractionError::RecognitionError("psm 6".to_string()).is_recoverable());
        assert!(!ExtractionError::ImageDecodeError("bad header".to_string()).is_recoverable());
        assert!(!ExtractionError::RecognitionExhausted { attempted: 36 }.is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = ExtractionError::InvalidCandidate {
            field: Field::DocumentNumber,
            value: "ABC".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid document number candidate: ABC");

        let err = ExtractionError::InputTooLarge { size: 20, limit: 10 };
        assert_eq!(
            err.to_string(),
            "Input too large: 20 bytes exceeds the 10 byte limit"
        );
    }
}
