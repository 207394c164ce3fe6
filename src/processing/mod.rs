pub mod ensemble;
pub mod extractors;
pub mod field_correction;
pub mod image;
pub mod ocr;
pub mod portrait;
pub mod ranking;

pub use ensemble::{EnsembleOutcome, EnsembleVoter};
pub use extractors::{ExtractedFields, FieldExtractor};
pub use field_correction::CorrectionTables;
pub use self::image::ImageProcessor;
pub use ocr::{
    PreprocessedImage, RawRecognition, RecognitionConfig, RecognitionEngine, RecognitionPassRunner,
    SweepOutcome, TesseractEngine,
};
pub use portrait::{PortraitConfig, PortraitExtractor};
pub use ranking::CandidateRanker;
