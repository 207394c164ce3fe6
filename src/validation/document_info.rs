use serde::Serialize;

use super::FormatValidator;
use crate::processing::field_correction::DOCUMENT_NUMBER_LEN;
use crate::models::Field;
use crate::utils::ExtractionError;

/// The parts a PAN is made of.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentNumberInfo {
    pub document_number: String,
    pub first_three_letters: String,
    pub holder_type_indicator: char,
    pub holder_type: &'static str,
    pub surname_initial: char,
    pub sequential_number: String,
    pub check_letter: char,
}

impl DocumentNumberInfo {
    pub fn parse(document_number: &str) -> Result<Self, ExtractionError> {
        let number = document_number.trim().to_uppercase();
        if number.chars().count() != DOCUMENT_NUMBER_LEN {
            return Err(ExtractionError::InvalidCandidate {
                field: Field::DocumentNumber,
                value: format!("{} (must be exactly {} characters)", number, DOCUMENT_NUMBER_LEN),
            });
        }
        if !FormatValidator::is_valid_document_number(&number) {
            return Err(ExtractionError::InvalidCandidate {
                field: Field::DocumentNumber,
                value: number,
            });
        }

        // Grammar check above guarantees ten ASCII characters.
        let chars: Vec<char> = number.chars().collect();
        let holder_type_indicator = chars[3];
        Ok(DocumentNumberInfo {
            first_three_letters: chars[..3].iter().collect(),
            holder_type_indicator,
            holder_type: holder_type(holder_type_indicator),
            surname_initial: chars[4],
            sequential_number: chars[5..9].iter().collect(),
            check_letter: chars[9],
            document_number: number,
        })
    }
}

fn holder_type(indicator: char) -> &'static str {
    match indicator {
        'A' => "Association of Persons (AOP)",
        'B' => "Body of Individuals (BOI)",
        'C' => "Company",
        'F' => "Firm",
        'G' => "Government",
        'H' => "Hindu Undivided Family (HUF)",
        'L' => "Local Authority",
        'J' => "Artificial Juridical Person",
        'P' => "Individual",
        'T' => "Trust",
        _ => "Unknown",
    }
}
