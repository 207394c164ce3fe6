use std::collections::HashMap;

/// Length of a PAN: five letters, four digits, one letter.
pub const DOCUMENT_NUMBER_LEN: usize = 10;
pub const LETTER_POSITIONS: [usize; 6] = [0, 1, 2, 3, 4, 9];
pub const DIGIT_POSITIONS: [usize; 4] = [5, 6, 7, 8];

const DIGIT_TO_LETTER: [(char, char); 10] = [
    ('0', 'O'),
    ('1', 'I'),
    ('5', 'S'),
    ('8', 'B'),
    ('3', 'E'),
    ('2', 'Z'),
    ('6', 'G'),
    ('9', 'G'),
    ('4', 'A'),
    ('7', 'T'),
];

const LETTER_TO_DIGIT: [(char, char); 10] = [
    ('O', '0'),
    ('I', '1'),
    ('L', '1'),
    ('S', '5'),
    ('Z', '2'),
    ('B', '8'),
    ('G', '6'),
    ('J', '5'),
    ('R', '4'),
    ('T', '7'),
];

// Names only get the unambiguous confusions.
const NAME_DIGIT_TO_LETTER: [(char, char); 5] =
    [('0', 'O'), ('1', 'I'), ('5', 'S'), ('8', 'B'), ('3', 'E')];

// Letters accepted in the digit zone when loosely matching a label line.
const DIGIT_LOOKALIKES: &str = "OILSZG";

/// Letter/digit confusion maps used by every extractor.
///
/// Built once per engine and injected, so tests can swap in other tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionTables {
    digit_to_letter: HashMap<char, char>,
    letter_to_digit: HashMap<char, char>,
    name_digit_to_letter: HashMap<char, char>,
    digit_lookalikes: Vec<char>,
}

impl Default for CorrectionTables {
    fn default() -> Self {
        CorrectionTables::new(
            &DIGIT_TO_LETTER,
            &LETTER_TO_DIGIT,
            &NAME_DIGIT_TO_LETTER,
            DIGIT_LOOKALIKES,
        )
    }
}

impl CorrectionTables {
    pub fn new(
        digit_to_letter: &[(char, char)],
        letter_to_digit: &[(char, char)],
        name_digit_to_letter: &[(char, char)],
        digit_lookalikes: &str,
    ) -> Self {
        CorrectionTables {
            digit_to_letter: digit_to_letter.iter().copied().collect(),
            letter_to_digit: letter_to_digit.iter().copied().collect(),
            name_digit_to_letter: name_digit_to_letter.iter().copied().collect(),
            digit_lookalikes: digit_lookalikes.chars().collect(),
        }
    }

    /// Force each position of a document-number candidate into its
    /// character class. Strings shorter than the grammar are returned
    /// uppercased but otherwise untouched.
    pub fn correct_document_number(&self, candidate: &str) -> String {
        let mut chars: Vec<char> = candidate.to_uppercase().chars().collect();
        if chars.len() < DOCUMENT_NUMBER_LEN {
            return chars.into_iter().collect();
        }

        for &i in DIGIT_POSITIONS.iter() {
            if let Some(digit) = self.letter_to_digit.get(&chars[i]) {
                chars[i] = *digit;
            }
        }
        for &i in LETTER_POSITIONS.iter() {
            if chars[i].is_ascii_digit() {
                if let Some(letter) = self.digit_to_letter.get(&chars[i]) {
                    chars[i] = *letter;
                }
            }
        }

        chars.into_iter().collect()
    }

    /// A digit, or a letter the engine commonly reads in place of one.
    pub fn is_digit_like(&self, c: char) -> bool {
        c.is_ascii_digit() || self.digit_lookalikes.contains(&c)
    }

    /// Collapse whitespace, uppercase, undo digit/letter confusions and drop
    /// artifact words made of one repeated character ("EEE").
    pub fn clean_name(&self, raw: &str) -> String {
        let corrected: String = raw
            .to_uppercase()
            .chars()
            .map(|c| *self.name_digit_to_letter.get(&c).unwrap_or(&c))
            .collect();

        corrected
            .split_whitespace()
            .filter(|word| !is_repeated_char_noise(word))
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

fn is_repeated_char_noise(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => word.chars().count() >= 2 && chars.all(|c| c == first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FormatValidator;

    #[test]
    fn test_letter_in_digit_zone() {
        let tables = CorrectionTables::default();
        assert_eq!(tables.correct_document_number("HJTPB98B1M"), "HJTPB9881M");
        assert_eq!(tables.correct_document_number("ABCDEIO5SF"), "ABCDE1055F");
    }

    #[test]
    fn test_digit_in_letter_zone() {
        let tables = CorrectionTables::default();
        assert_eq!(tables.correct_document_number("A8CDE12347"), "ABCDE1234T");
        assert_eq!(tables.correct_document_number("0BCDE1234F"), "OBCDE1234F");
    }

    #[test]
    fn test_correction_is_idempotent_on_valid_numbers() {
        let tables = CorrectionTables::default();
        for valid in ["ABCDE1234F", "HJTPB9881M", "ZZZZZ0000Z", "BGOPS6789T"] {
            assert!(FormatValidator::is_valid_document_number(valid));
            assert_eq!(tables.correct_document_number(valid), valid);
        }
    }

    #[test]
    fn test_short_candidate_is_left_alone() {
        let tables = CorrectionTables::default();
        assert_eq!(tables.correct_document_number("abc12"), "ABC12");
    }

    #[test]
    fn test_substitute_tables() {
        let tables = CorrectionTables::new(&[], &[('Q', '0')], &[], "Q");
        assert_eq!(tables.correct_document_number("ABCDEQQQQ1"), "ABCDE00001");
        assert!(tables.is_digit_like('Q'));
        assert!(!tables.is_digit_like('O'));
    }

    #[test]
    fn test_clean_name() {
        let tables = CorrectionTables::default();
        assert_eq!(tables.clean_name("  ashw1n   balaguru EEE "), "ASHWIN BALAGURU");
        assert_eq!(tables.clean_name("R0HAN 5HARMA"), "ROHAN SHARMA");
        assert_eq!(tables.clean_name("A KUMAR"), "A KUMAR");
    }
}
