use serde::{Deserialize, Serialize};

/// Keyword tables and plausibility bounds shared by the extractors and the
/// validators. Defaults describe the Indian PAN card layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// A candidate name containing any of these as a substring is rejected.
    pub name_noise_keywords: Vec<String>,
    /// Words dropped from the line preceding the secondary-name label.
    pub name_line_noise: Vec<String>,
    /// Extra terms the isolated-token fallback refuses as a secondary name.
    pub secondary_blocklist: Vec<String>,
    /// Whitespace-stripped header phrases that disqualify a nearby
    /// sliding-window document number.
    pub false_positive_headers: Vec<String>,
    pub min_name_len: usize,
    pub min_word_len: usize,
    pub max_word_len: usize,
    /// Longest run of consonants (or vowels) a name word may contain.
    pub max_consonant_run: usize,
    pub max_vowel_run: usize,
    pub min_birth_year: i32,
    pub max_birth_year: i32,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        ExtractionRules {
            name_noise_keywords: to_strings(&[
                "INCOME",
                "TAX",
                "DEPARTMENT",
                "GOVT",
                "INDIA",
                "PERMANENT",
                "ACCOUNT",
                "NUMBER",
                "CARD",
                "SIGNATURE",
                "DATE",
                "BIRTH",
                "FATHER",
                "ADDRESS",
                "PAN",
                "GOVERNMENT",
                "MINISTRY",
                "OFFICIAL",
            ]),
            name_line_noise: to_strings(&["TAX", "DEPT", "INCOME", "GOVT", "CARD", "NUMBER"]),
            secondary_blocklist: to_strings(&[
                "INCOME",
                "GOVERNMENT",
                "DEPARTMENT",
                "PERMANENT",
                "ACCOUNT",
                "NUMBER",
                "CARD",
                "INDIA",
            ]),
            false_positive_headers: to_strings(&[
                "INCOMETAXDEPARTMENT",
                "GOVERNMENTOF",
                "ACCOUNTNUMBER",
                "PERMANENTACCOUNT",
                "CARDSIGNATURE",
            ]),
            min_name_len: 5,
            min_word_len: 3,
            max_word_len: 15,
            max_consonant_run: 3,
            max_vowel_run: 3,
            min_birth_year: 1920,
            max_birth_year: 2010,
        }
    }
}

impl ExtractionRules {
    pub fn contains_name_noise(&self, text: &str) -> bool {
        contains_any(text, &self.name_noise_keywords)
    }

    pub fn is_name_line_noise(&self, word: &str) -> bool {
        contains_any(word, &self.name_line_noise)
    }

    pub fn is_secondary_blocklisted(&self, text: &str) -> bool {
        contains_any(text, &self.secondary_blocklist)
    }

    /// `context` must already be uppercase with whitespace removed.
    pub fn near_false_positive_header(&self, context: &str) -> bool {
        contains_any(context, &self.false_positive_headers)
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let upper = text.to_uppercase();
    keywords.iter().any(|k| upper.contains(k.as_str()))
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching_is_substring_and_case_insensitive() {
        let rules = ExtractionRules::default();
        assert!(rules.contains_name_noise("Income Tax Department"));
        assert!(rules.contains_name_noise("PANKAJ"));
        assert!(!rules.contains_name_noise("ASHWIN BALAGURU"));
        assert!(rules.near_false_positive_header("XXGOVERNMENTOFINDIA"));
    }

    #[test]
    fn test_partial_rules_fill_defaults() {
        let rules: ExtractionRules =
            serde_json::from_str(r#"{"min_birth_year": 1900}"#).unwrap();
        assert_eq!(rules.min_birth_year, 1900);
        assert_eq!(rules.max_birth_year, 2010);
        assert_eq!(rules.name_line_noise.len(), 6);
    }
}
