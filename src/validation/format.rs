use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{ExtractionRules, Field};

lazy_static! {
    static ref DOCUMENT_NUMBER_GRAMMAR: Regex = Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap();
    static ref NORMALIZED_DATE: Regex = Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4})$").unwrap();
}

const VOWELS: &str = "AEIOU";

/// Pure predicates deciding whether a value may be returned for a field.
pub struct FormatValidator<'a> {
    rules: &'a ExtractionRules,
}

impl<'a> FormatValidator<'a> {
    pub fn new(rules: &'a ExtractionRules) -> Self {
        FormatValidator { rules }
    }

    pub fn is_valid_document_number(value: &str) -> bool {
        DOCUMENT_NUMBER_GRAMMAR.is_match(value)
    }

    pub fn validate_field(&self, field: Field, value: &str) -> bool {
        match field {
            Field::DocumentNumber => Self::is_valid_document_number(value),
            Field::PrimaryName => self.is_valid_name(value, false),
            Field::SecondaryName => self.is_valid_name(value, true),
            Field::DateOfBirth => self.is_valid_normalized_date(value),
        }
    }

    /// Shape check for a human name. Single words are only accepted when
    /// `allow_single_word` is set.
    pub fn is_valid_name(&self, text: &str, allow_single_word: bool) -> bool {
        let upper = text.trim().to_uppercase();

        if upper.chars().count() < self.rules.min_name_len {
            return false;
        }
        if self.rules.contains_name_noise(&upper) {
            return false;
        }

        let words: Vec<&str> = upper.split_whitespace().collect();
        if words.is_empty() || (words.len() < 2 && !allow_single_word) {
            return false;
        }

        words.iter().all(|word| self.is_plausible_word(word))
    }

    fn is_plausible_word(&self, word: &str) -> bool {
        let len = word.chars().count();
        if len < self.rules.min_word_len || len > self.rules.max_word_len {
            return false;
        }
        if !word.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
            return false;
        }

        let mut vowel_run = 0;
        let mut consonant_run = 0;
        for c in word.chars() {
            if c == '-' {
                vowel_run = 0;
                consonant_run = 0;
            } else if VOWELS.contains(c) {
                vowel_run += 1;
                consonant_run = 0;
                if vowel_run > self.rules.max_vowel_run {
                    return false;
                }
            } else {
                consonant_run += 1;
                vowel_run = 0;
                if consonant_run > self.rules.max_consonant_run {
                    return false;
                }
            }
        }
        true
    }

    /// Range and calendar check for a date of birth.
    pub fn is_valid_birth_date(&self, day: u32, month: u32, year: i32) -> bool {
        (1..=31).contains(&day)
            && (1..=12).contains(&month)
            && (self.rules.min_birth_year..=self.rules.max_birth_year).contains(&year)
            && NaiveDate::from_ymd_opt(year, month, day).is_some()
    }

    /// Accepts only the engine's `DD/MM/YYYY` output form.
    pub fn is_valid_normalized_date(&self, value: &str) -> bool {
        let Some(caps) = NORMALIZED_DATE.captures(value) else {
            return false;
        };
        match (
            caps[1].parse::<u32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<i32>(),
        ) {
            (Ok(day), Ok(month), Ok(year)) => self.is_valid_birth_date(day, month, year),
            _ => false,
        }
    }
}
