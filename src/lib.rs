pub mod config;
pub mod identity_extractor;
pub mod models;
pub mod processing;
pub mod utils;
pub mod validation;

pub use config::ExtractorConfig;
pub use identity_extractor::IdentityExtractor;
