use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};
use std::fmt;

/// The text fields the engine extracts from a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    DocumentNumber,
    PrimaryName,
    SecondaryName,
    DateOfBirth,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::DocumentNumber,
        Field::PrimaryName,
        Field::SecondaryName,
        Field::DateOfBirth,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Field::DocumentNumber => "document number",
            Field::PrimaryName => "primary name",
            Field::SecondaryName => "secondary name",
            Field::DateOfBirth => "date of birth",
        };
        write!(f, "{}", label)
    }
}

/// Which search produced a candidate. Variants are grouped per field and
/// declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    // Document number
    LabelAnchored,
    RegexSweep,
    SlidingWindow,
    // Primary name
    BeforeSecondaryLabel,
    NameLabel,
    CapitalisedRun,
    // Secondary name
    SameLine,
    FollowingLines,
    LastWordOfPrimary,
    IsolatedToken,
    // Date of birth
    DatePattern,
}

impl Strategy {
    pub fn field(&self) -> Field {
        match self {
            Strategy::LabelAnchored | Strategy::RegexSweep | Strategy::SlidingWindow => {
                Field::DocumentNumber
            }
            Strategy::BeforeSecondaryLabel | Strategy::NameLabel | Strategy::CapitalisedRun => {
                Field::PrimaryName
            }
            Strategy::SameLine
            | Strategy::FollowingLines
            | Strategy::LastWordOfPrimary
            | Strategy::IsolatedToken => Field::SecondaryName,
            Strategy::DatePattern => Field::DateOfBirth,
        }
    }

    /// Rank within the strategy's own field; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Strategy::LabelAnchored
            | Strategy::BeforeSecondaryLabel
            | Strategy::SameLine
            | Strategy::DatePattern => 0,
            Strategy::RegexSweep | Strategy::NameLabel | Strategy::FollowingLines => 1,
            Strategy::SlidingWindow | Strategy::CapitalisedRun | Strategy::LastWordOfPrimary => 2,
            Strategy::IsolatedToken => 3,
        }
    }

    /// Guesses derived from convention rather than read off the card.
    pub fn is_inferred(&self) -> bool {
        matches!(self, Strategy::LastWordOfPrimary)
    }
}

/// One recognition pass over one image variant.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAttempt {
    pub text: String,
    /// Mean token confidence, 0-100.
    pub confidence: f32,
}

impl RecognitionAttempt {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        RecognitionAttempt {
            text: text.into(),
            confidence: confidence.clamp(0.0, 100.0),
        }
    }

    /// Average the valid per-token confidences. Negative scores are the
    /// engine's "no confidence" sentinel and are left out.
    pub fn from_tokens(text: impl Into<String>, token_confidences: &[i32]) -> Self {
        let valid: Vec<i32> = token_confidences
            .iter()
            .copied()
            .filter(|c| *c >= 0)
            .collect();
        let confidence = if valid.is_empty() {
            0.0
        } else {
            valid.iter().sum::<i32>() as f32 / valid.len() as f32
        };
        Self::new(text, confidence)
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A provisional value for one field, not yet known to be the winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCandidate {
    pub value: String,
    pub strategy: Strategy,
    /// Lines between the value and the label that anchored it, 0 when the
    /// strategy has no anchor.
    pub distance_from_anchor: usize,
    /// Where the value sits in the text the strategy scanned. Only
    /// comparable between candidates of the same strategy.
    pub position: usize,
}

impl FieldCandidate {
    pub fn new(value: impl Into<String>, strategy: Strategy, distance_from_anchor: usize) -> Self {
        FieldCandidate {
            value: value.into(),
            strategy,
            distance_from_anchor,
            position: 0,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

/// How many of the four text fields were found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldCompleteness {
    pub found: usize,
    pub total: usize,
    pub ratio: f32,
}

/// The record handed back to the caller of `extract`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExtractionResult {
    pub document_number: Option<String>,
    pub primary_name: Option<String>,
    pub secondary_name: Option<String>,
    /// Set when the secondary name was guessed from the primary name rather
    /// than read from the card.
    pub secondary_name_inferred: bool,
    pub date_of_birth: Option<String>,
    #[serde(serialize_with = "serialize_portrait")]
    pub portrait: Option<Vec<u8>>,
    pub raw_text: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn failed(error: impl fmt::Display) -> Self {
        ExtractionResult {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::DocumentNumber => self.document_number.as_deref(),
            Field::PrimaryName => self.primary_name.as_deref(),
            Field::SecondaryName => self.secondary_name.as_deref(),
            Field::DateOfBirth => self.date_of_birth.as_deref(),
        }
    }

    pub fn completeness(&self) -> FieldCompleteness {
        let total = Field::ALL.len();
        let found = Field::ALL
            .iter()
            .filter(|f| self.field(**f).is_some())
            .count();
        FieldCompleteness {
            found,
            total,
            ratio: found as f32 / total as f32,
        }
    }

    pub fn status_message(&self) -> String {
        if !self.success {
            return format!(
                "Extraction failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }
        let completeness = self.completeness();
        let summary = if completeness.found == completeness.total {
            "All card fields extracted".to_string()
        } else if completeness.found >= 2 {
            format!(
                "Partial extraction: {}/{} fields found, please verify and correct",
                completeness.found, completeness.total
            )
        } else {
            "Low extraction quality, please retake a clearer image".to_string()
        };
        format!("{} (success rate {:.0}%)", summary, completeness.ratio * 100.0)
    }
}

fn serialize_portrait<S>(portrait: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match portrait {
        Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ignores_sentinels() {
        let attempt = RecognitionAttempt::from_tokens("ABC", &[-1, 90, 70, -1]);
        assert_eq!(attempt.confidence, 80.0);

        let attempt = RecognitionAttempt::from_tokens("", &[-1, -1]);
        assert_eq!(attempt.confidence, 0.0);
        assert!(!attempt.has_text());
    }

    #[test]
    fn test_strategy_priorities_follow_declaration() {
        assert!(Strategy::LabelAnchored.priority() < Strategy::RegexSweep.priority());
        assert!(Strategy::RegexSweep.priority() < Strategy::SlidingWindow.priority());
        assert!(Strategy::LastWordOfPrimary.priority() < Strategy::IsolatedToken.priority());
        assert_eq!(Strategy::NameLabel.field(), Field::PrimaryName);
        assert!(Strategy::LastWordOfPrimary.is_inferred());
    }

    #[test]
    fn test_completeness_ratio() {
        let result = ExtractionResult {
            document_number: Some("ABCDE1234F".to_string()),
            primary_name: Some("ASHWIN BALAGURU".to_string()),
            success: true,
            ..Default::default()
        };
        let completeness = result.completeness();
        assert_eq!(completeness.found, 2);
        assert_eq!(completeness.total, 4);
        assert_eq!(completeness.ratio, 0.5);
        assert!(result.status_message().starts_with("Partial extraction: 2/4"));
    }

    #[test]
    fn test_failed_result() {
        let result = ExtractionResult::failed("bad header");
        assert!(!result.success);
        assert_eq!(result.completeness().found, 0);
        assert_eq!(result.status_message(), "Extraction failed: bad header");
    }

    #[test]
    fn test_serializes_portrait_as_base64() {
        let result = ExtractionResult {
            portrait: Some(vec![1, 2, 3]),
            success: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["portrait"], "AQID");
        assert_eq!(json["document_number"], serde_json::Value::Null);
        assert_eq!(json["secondary_name_inferred"], false);
        assert!(json.get("error").is_none());
    }
}
