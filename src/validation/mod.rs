pub mod document_info;
pub mod format;

pub use document_info::DocumentNumberInfo;
pub use format::FormatValidator;
