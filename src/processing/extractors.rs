// Field extraction over the combined recognition text. Each field has an
// ordered chain of strategies; the first strategy that yields a validated
// candidate decides the field.
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;

use super::field_correction::{CorrectionTables, DOCUMENT_NUMBER_LEN};
use super::ranking::{CandidateRanker, StrategyChain, StrategyFn};
use crate::models::{ExtractionRules, Field, FieldCandidate, Strategy};
use crate::utils::ExtractionError;
use crate::validation::FormatValidator;

lazy_static! {
    static ref DOCUMENT_NUMBER_LABEL: Regex =
        Regex::new(r"(?i)Permanent\s*Account\s*Number|^\s*PAN\b|Account\s*Number\s*Card").unwrap();
    static ref DOCUMENT_NUMBER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b([A-Z]{5}[0-9]{4}[A-Z])\b").unwrap(),
        Regex::new(r"\b([A-Z]{5}\s*[0-9]{4}\s*[A-Z])\b").unwrap(),
    ];

    // Primary name
    static ref SECONDARY_LABEL_LOOSE: Regex = Regex::new(r"(?i)(Father'?s?\s*Name|/FN|F/FN)").unwrap();
    static ref NAME_LABEL: Regex = Regex::new(r"(?i)\bName\b").unwrap();
    static ref NAME_LABEL_EXCLUDE: Regex = Regex::new(r"(?i)Father|Mother|F/|/FN").unwrap();
    static ref NAME_SCAN_STOP: Regex =
        Regex::new(r"(?i)Father|Mother|F/|/FN|Date|Birth|Signature|Address").unwrap();
    static ref CAPITALISED_RUN: Regex =
        Regex::new(r"\b([A-Z]{3,}\s+[A-Z]{3,}(?:\s+[A-Z]{3,})?)\b").unwrap();

    // Secondary name
    static ref SECONDARY_LABEL: Regex = Regex::new(r"(?i)Father'?s?\s*Name|\bFN\b|पिता\s*का\s*नाम").unwrap();
    static ref SECONDARY_SAME_LINE: Regex = Regex::new(
        r"(?i)(?:Father'?s?\s*Name|\bFN|पिता\s*का\s*नाम)[:\s/]+([A-Z][A-Z\s]+?)(?:\s+[0-9]|\s*$)"
    ).unwrap();
    static ref SECONDARY_SCAN_STOP: Regex = Regex::new(r"(?i)Date|Birth|Signature|Address|जन्म").unwrap();
    static ref ISOLATED_TOKEN: Regex = Regex::new(r"\b([A-Z]{4,})\b").unwrap();

    // Dates: day-first and year-first
    static ref DATE_DAY_FIRST: Regex =
        Regex::new(r"([0-9]{1,2})[/.\-]([0-9]{1,2})[/.\-]([0-9]{4})").unwrap();
    static ref DATE_YEAR_FIRST: Regex =
        Regex::new(r"([0-9]{4})[/.\-]([0-9]{1,2})[/.\-]([0-9]{1,2})").unwrap();
}

/// Everything a strategy may look at for one field search.
pub struct Search<'s> {
    tables: &'s CorrectionTables,
    rules: &'s ExtractionRules,
    text: &'s str,
    primary_name: Option<&'s str>,
}

impl<'s> Search<'s> {
    fn validator(&self) -> FormatValidator<'s> {
        FormatValidator::new(self.rules)
    }

    /// Trimmed, non-empty lines.
    fn cleaned_lines(&self) -> Vec<&'s str> {
        self.text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    fn is_primary(&self, value: &str) -> bool {
        self.primary_name == Some(value)
    }

    /// Correct a raw window and check it against the grammar. Rejections
    /// are logged and otherwise dropped.
    fn accept_document_number(&self, raw: &str) -> Option<String> {
        let corrected = self.tables.correct_document_number(raw);
        match Self::check_document_number(corrected) {
            Ok(number) => Some(number),
            Err(e) => {
                debug!("{} (raw {:?})", e, raw);
                None
            }
        }
    }

    fn check_document_number(corrected: String) -> Result<String, ExtractionError> {
        if FormatValidator::is_valid_document_number(&corrected) {
            Ok(corrected)
        } else {
            Err(ExtractionError::InvalidCandidate {
                field: Field::DocumentNumber,
                value: corrected,
            })
        }
    }
}

/// Field extractors bound to one set of correction tables and rules.
pub struct FieldExtractor<'a> {
    tables: &'a CorrectionTables,
    rules: &'a ExtractionRules,
}

/// The four text fields, each already validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub document_number: Option<String>,
    pub primary_name: Option<String>,
    pub secondary_name: Option<String>,
    /// The secondary name is a guess made from the primary name.
    pub secondary_name_inferred: bool,
    pub date_of_birth: Option<String>,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(tables: &'a CorrectionTables, rules: &'a ExtractionRules) -> Self {
        FieldExtractor { tables, rules }
    }

    fn search<'s>(&'s self, text: &'s str, primary_name: Option<&'s str>) -> Search<'s> {
        Search {
            tables: self.tables,
            rules: self.rules,
            text,
            primary_name,
        }
    }

    pub fn extract_fields(&self, text: &str) -> ExtractedFields {
        let document_number = self.document_number(text).map(|c| c.value);
        let primary_name = self.primary_name(text).map(|c| c.value);
        let secondary = self.secondary_name(text, primary_name.as_deref());
        let secondary_name_inferred = secondary
            .as_ref()
            .map_or(false, |c| c.strategy.is_inferred());
        let secondary_name = secondary.map(|c| c.value);
        let date_of_birth = self.date_of_birth(text).map(|c| c.value);

        info!(
            "Extracted fields: number={:?}, name={:?}, secondary={:?}{}, dob={:?}",
            document_number,
            primary_name,
            secondary_name,
            if secondary_name_inferred { " (inferred)" } else { "" },
            date_of_birth
        );

        ExtractedFields {
            document_number,
            primary_name,
            secondary_name,
            secondary_name_inferred,
            date_of_birth,
        }
    }

    pub fn document_number(&self, text: &str) -> Option<FieldCandidate> {
        CandidateRanker::select(&document_number_chain(), &self.search(text, None))
    }

    pub fn primary_name(&self, text: &str) -> Option<FieldCandidate> {
        CandidateRanker::select(&primary_name_chain(), &self.search(text, None))
    }

    /// `primary_name` is the already-extracted holder name; it is never
    /// returned as the secondary name.
    pub fn secondary_name(&self, text: &str, primary_name: Option<&str>) -> Option<FieldCandidate> {
        CandidateRanker::select(&secondary_name_chain(), &self.search(text, primary_name))
    }

    pub fn date_of_birth(&self, text: &str) -> Option<FieldCandidate> {
        CandidateRanker::select(&date_of_birth_chain(), &self.search(text, None))
    }
}

pub fn document_number_chain<'s>() -> StrategyChain<Search<'s>> {
    vec![
        (Strategy::LabelAnchored, label_anchored_number as StrategyFn<Search<'s>>),
        (Strategy::RegexSweep, regex_sweep_number as StrategyFn<Search<'s>>),
        (Strategy::SlidingWindow, sliding_window_number as StrategyFn<Search<'s>>),
    ]
}

pub fn primary_name_chain<'s>() -> StrategyChain<Search<'s>> {
    vec![
        (Strategy::BeforeSecondaryLabel, name_before_secondary_label as StrategyFn<Search<'s>>),
        (Strategy::NameLabel, name_after_label as StrategyFn<Search<'s>>),
        (Strategy::CapitalisedRun, capitalised_run_name as StrategyFn<Search<'s>>),
    ]
}

pub fn secondary_name_chain<'s>() -> StrategyChain<Search<'s>> {
    vec![
        (Strategy::SameLine, secondary_same_line as StrategyFn<Search<'s>>),
        (Strategy::FollowingLines, secondary_following_lines as StrategyFn<Search<'s>>),
        (Strategy::LastWordOfPrimary, secondary_from_primary as StrategyFn<Search<'s>>),
        (Strategy::IsolatedToken, secondary_isolated_token as StrategyFn<Search<'s>>),
    ]
}

pub fn date_of_birth_chain<'s>() -> StrategyChain<Search<'s>> {
    vec![(Strategy::DatePattern, date_patterns as StrategyFn<Search<'s>>)]
}

// Document number

fn loosely_matches_grammar(window: &[char], tables: &CorrectionTables) -> bool {
    window.len() == DOCUMENT_NUMBER_LEN
        && window[..5].iter().all(|c| c.is_ascii_alphabetic())
        && window[5..9].iter().all(|c| tables.is_digit_like(*c))
        && window[9].is_ascii_alphabetic()
}

fn strip_whitespace(text: &str) -> Vec<char> {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn label_anchored_number(search: &Search) -> Vec<FieldCandidate> {
    let upper = search.text.to_uppercase();
    let mut lines: Vec<(usize, &str)> = Vec::new();
    let mut line_start = 0;
    for line in upper.split('\n') {
        lines.push((line_start, line));
        line_start += line.len() + 1;
    }
    let mut candidates = Vec::new();

    for (i, (_, line)) in lines.iter().enumerate() {
        if !DOCUMENT_NUMBER_LABEL.is_match(line) {
            continue;
        }
        // The label line itself and the two after it.
        for (offset, (start, check_line)) in lines.iter().skip(i).take(3).enumerate() {
            let compact = strip_whitespace(check_line);
            for (w, window) in compact.windows(DOCUMENT_NUMBER_LEN).enumerate() {
                if !loosely_matches_grammar(window, search.tables) {
                    continue;
                }
                let raw: String = window.iter().collect();
                if let Some(number) = search.accept_document_number(&raw) {
                    candidates.push(
                        FieldCandidate::new(number, Strategy::LabelAnchored, offset).at(start + w),
                    );
                }
            }
        }
    }
    candidates
}

fn regex_sweep_number(search: &Search) -> Vec<FieldCandidate> {
    let upper = search.text.to_uppercase();
    let mut hits: Vec<(usize, String)> = Vec::new();

    for pattern in DOCUMENT_NUMBER_PATTERNS.iter() {
        for caps in pattern.captures_iter(&upper) {
            let start = caps.get(1).map_or(0, |m| m.start());
            let raw: String = strip_whitespace(&caps[1]).into_iter().collect();
            if let Some(number) = search.accept_document_number(&raw) {
                hits.push((start, number));
            }
        }
    }

    // Both patterns can hit the same spot; keep each number at its first
    // position.
    hits.sort_by_key(|(start, _)| *start);
    let mut found: Vec<(usize, String)> = Vec::new();
    for (start, number) in hits {
        if !found.iter().any(|(_, n)| *n == number) {
            found.push((start, number));
        }
    }
    found
        .into_iter()
        .map(|(start, n)| FieldCandidate::new(n, Strategy::RegexSweep, 0).at(start))
        .collect()
}

fn sliding_window_number(search: &Search) -> Vec<FieldCandidate> {
    let compact = strip_whitespace(&search.text.to_uppercase());
    let mut found: Vec<(usize, String)> = Vec::new();
    if compact.len() < DOCUMENT_NUMBER_LEN {
        return Vec::new();
    }

    for i in 0..=compact.len() - DOCUMENT_NUMBER_LEN {
        let window = &compact[i..i + DOCUMENT_NUMBER_LEN];

        let context_end = (i + 15).min(compact.len());
        let context: String = compact[i.saturating_sub(20)..context_end].iter().collect();
        if search.rules.near_false_positive_header(&context) {
            continue;
        }

        let alpha = window.iter().filter(|c| c.is_ascii_alphabetic()).count();
        let digit_like = window.iter().filter(|c| search.tables.is_digit_like(**c)).count();
        if alpha < 5 || digit_like < 4 {
            continue;
        }

        let raw: String = window.iter().collect();
        if let Some(number) = search.accept_document_number(&raw) {
            if !found.iter().any(|(_, n)| *n == number) {
                found.push((i, number));
            }
        }
    }
    found
        .into_iter()
        .map(|(i, n)| FieldCandidate::new(n, Strategy::SlidingWindow, 0).at(i))
        .collect()
}

// Names

/// Uppercase and keep only ASCII capitals and whitespace.
fn letters_only(line: &str) -> String {
    line.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

fn name_before_secondary_label(search: &Search) -> Vec<FieldCandidate> {
    let lines = search.cleaned_lines();
    let label_index = match lines.iter().position(|l| SECONDARY_LABEL_LOOSE.is_match(l)) {
        Some(i) if i > 0 => i,
        _ => return Vec::new(),
    };

    let previous = letters_only(lines[label_index - 1]);
    let words: Vec<&str> = previous.split_whitespace().collect();
    if words.len() < 2 {
        return Vec::new();
    }

    let mut name_words: Vec<&str> = Vec::new();
    for &word in words.iter().take(4) {
        if word.len() >= 3 && !search.rules.is_name_line_noise(word) {
            name_words.push(word);
        } else if name_words.len() >= 2 {
            break;
        }
    }
    if name_words.len() < 2 {
        return Vec::new();
    }

    let cleaned = search.tables.clean_name(&name_words.join(" "));
    if search.validator().is_valid_name(&cleaned, false) {
        vec![FieldCandidate::new(cleaned, Strategy::BeforeSecondaryLabel, 1).at(label_index - 1)]
    } else {
        Vec::new()
    }
}

fn name_after_label(search: &Search) -> Vec<FieldCandidate> {
    let lines = search.cleaned_lines();
    let validator = search.validator();
    let mut candidates = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !NAME_LABEL.is_match(line) || NAME_LABEL_EXCLUDE.is_match(line) {
            continue;
        }
        for (offset, next_line) in lines.iter().enumerate().skip(i + 1).take(3) {
            if NAME_SCAN_STOP.is_match(next_line) {
                break;
            }
            let letters = letters_only(next_line);
            if letters.len() < 5 {
                continue;
            }
            let cleaned = search.tables.clean_name(&letters);
            if validator.is_valid_name(&cleaned, false) {
                let candidate = FieldCandidate::new(cleaned, Strategy::NameLabel, offset - i);
                candidates.push(candidate.at(offset));
                break;
            }
        }
    }
    candidates
}

fn capitalised_run_name(search: &Search) -> Vec<FieldCandidate> {
    let joined = search.cleaned_lines().join(" ");
    let validator = search.validator();

    CAPITALISED_RUN
        .captures_iter(&joined)
        .map(|caps| {
            let start = caps.get(1).map_or(0, |m| m.start());
            (start, search.tables.clean_name(&caps[1]))
        })
        .find(|(_, cleaned)| validator.is_valid_name(cleaned, false))
        .map(|(start, cleaned)| {
            vec![FieldCandidate::new(cleaned, Strategy::CapitalisedRun, 0).at(start)]
        })
        .unwrap_or_default()
}

fn secondary_same_line(search: &Search) -> Vec<FieldCandidate> {
    let validator = search.validator();
    let mut candidates = Vec::new();

    for (i, line) in search.cleaned_lines().into_iter().enumerate() {
        if !SECONDARY_LABEL.is_match(line) {
            continue;
        }
        let Some(caps) = SECONDARY_SAME_LINE.captures(line) else {
            continue;
        };
        let letters = letters_only(&caps[1]);
        if letters.len() < 3 {
            continue;
        }
        let cleaned = search.tables.clean_name(&letters);
        if validator.is_valid_name(&cleaned, true) && !search.is_primary(&cleaned) {
            candidates.push(FieldCandidate::new(cleaned, Strategy::SameLine, 0).at(i));
        }
    }
    candidates
}

fn secondary_following_lines(search: &Search) -> Vec<FieldCandidate> {
    let lines = search.cleaned_lines();
    let validator = search.validator();
    let mut candidates = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !SECONDARY_LABEL.is_match(line) {
            continue;
        }
        for (offset, next_line) in lines.iter().enumerate().skip(i + 1).take(2) {
            if SECONDARY_SCAN_STOP.is_match(next_line) {
                break;
            }
            let letters = letters_only(next_line);
            if letters.len() < 3 {
                continue;
            }
            let cleaned = search.tables.clean_name(&letters);
            if validator.is_valid_name(&cleaned, true) && !search.is_primary(&cleaned) {
                let candidate = FieldCandidate::new(cleaned, Strategy::FollowingLines, offset - i);
                candidates.push(candidate.at(offset));
            }
        }
    }
    candidates
}

// Assumes the given-name + father's-name convention; a guess, not a reading.
fn secondary_from_primary(search: &Search) -> Vec<FieldCandidate> {
    let Some(primary) = search.primary_name else {
        return Vec::new();
    };
    let words: Vec<&str> = primary.split_whitespace().collect();
    if words.len() < 2 {
        return Vec::new();
    }

    match words.last() {
        Some(last) if last.len() >= 3 && search.validator().is_valid_name(last, true) => {
            vec![FieldCandidate::new(*last, Strategy::LastWordOfPrimary, 0)]
        }
        _ => Vec::new(),
    }
}

fn secondary_isolated_token(search: &Search) -> Vec<FieldCandidate> {
    let joined = search.cleaned_lines().join(" ");
    let validator = search.validator();
    let mut found: Vec<(usize, String)> = Vec::new();

    for caps in ISOLATED_TOKEN.captures_iter(&joined) {
        let start = caps.get(1).map_or(0, |m| m.start());
        let cleaned = search.tables.clean_name(&caps[1]);
        if validator.is_valid_name(&cleaned, true)
            && !search.is_primary(&cleaned)
            && !search.rules.is_secondary_blocklisted(&cleaned)
            && !found.iter().any(|(_, n)| *n == cleaned)
        {
            found.push((start, cleaned));
        }
    }
    found
        .into_iter()
        .map(|(start, n)| FieldCandidate::new(n, Strategy::IsolatedToken, 0).at(start))
        .collect()
}

// Date of birth

fn date_patterns(search: &Search) -> Vec<FieldCandidate> {
    let validator = search.validator();
    let mut found: Vec<(usize, String)> = Vec::new();

    let mut gather = |pattern: &Regex, year_first: bool| {
        for caps in pattern.captures_iter(search.text) {
            let start = caps.get(0).map_or(0, |m| m.start());
            let (day, month, year) = if year_first {
                (caps[3].parse::<u32>(), caps[2].parse::<u32>(), caps[1].parse::<i32>())
            } else {
                (caps[1].parse::<u32>(), caps[2].parse::<u32>(), caps[3].parse::<i32>())
            };
            let (Ok(day), Ok(month), Ok(year)) = (day, month, year) else {
                continue;
            };
            if validator.is_valid_birth_date(day, month, year) {
                found.push((start, format!("{:02}/{:02}/{}", day, month, year)));
            } else {
                debug!("Discarded out-of-range date {:02}/{:02}/{}", day, month, year);
            }
        }
    };
    gather(&*DATE_DAY_FIRST, false);
    gather(&*DATE_YEAR_FIRST, true);

    found.sort_by_key(|(start, _)| *start);
    found
        .into_iter()
        .map(|(start, date)| FieldCandidate::new(date, Strategy::DatePattern, 0).at(start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_TEXT: &str = "INCOME TAX DEPARTMENT GOVT. OF INDIA\n\
        Permanent Account Number Card\n\
        ABCPK1234Q\n\
        Name\n\
        ASHWIN BALAGURU\n\
        Father's Name\n\
        BALAGURU\n\
        Date of Birth\n\
        27/10/2004\n";

    fn with_extractor<T>(f: impl FnOnce(&FieldExtractor) -> T) -> T {
        let tables = CorrectionTables::default();
        let rules = ExtractionRules::default();
        let extractor = FieldExtractor::new(&tables, &rules);
        f(&extractor)
    }

    #[test]
    fn test_full_card() {
        let fields = with_extractor(|e| e.extract_fields(CARD_TEXT));
        assert_eq!(fields.document_number.as_deref(), Some("ABCPK1234Q"));
        assert_eq!(fields.primary_name.as_deref(), Some("ASHWIN BALAGURU"));
        assert_eq!(fields.secondary_name.as_deref(), Some("BALAGURU"));
        assert!(!fields.secondary_name_inferred);
        assert_eq!(fields.date_of_birth.as_deref(), Some("27/10/2004"));
    }

    #[test]
    fn test_chain_order() {
        let order: Vec<Strategy> = document_number_chain().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            order,
            vec![Strategy::LabelAnchored, Strategy::RegexSweep, Strategy::SlidingWindow]
        );
        let order: Vec<Strategy> = secondary_name_chain().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            order,
            vec![
                Strategy::SameLine,
                Strategy::FollowingLines,
                Strategy::LastWordOfPrimary,
                Strategy::IsolatedToken
            ]
        );
    }

    #[test]
    fn test_label_anchored_number_corrects_lookalikes() {
        let text = "Permanent Account Number\nABCPK I2S4 Q\n";
        let found = with_extractor(|e| e.document_number(text)).unwrap();
        assert_eq!(found.value, "ABCPK1254Q");
        assert_eq!(found.strategy, Strategy::LabelAnchored);
        assert_eq!(found.distance_from_anchor, 1);
    }

    #[test]
    fn test_second_label_does_not_outrank_earlier_number() {
        let text = "Permanent Account Number\nABCPK1234Q\nPAN BCDPL5678R\n";
        let found = with_extractor(|e| e.document_number(text)).unwrap();
        assert_eq!(found.value, "ABCPK1234Q");
        assert_eq!(found.strategy, Strategy::LabelAnchored);
    }

    #[test]
    fn test_label_beats_earlier_regex_match() {
        let text = "ZZZZZ9999Z\nPermanent Account Number\nABCPK1234Q\n";
        let found = with_extractor(|e| e.document_number(text)).unwrap();
        assert_eq!(found.value, "ABCPK1234Q");
        assert_eq!(found.strategy, Strategy::LabelAnchored);
    }

    #[test]
    fn test_regex_sweep_with_spaces() {
        let text = "some header\nnumber abcpk 1234 q here\n";
        let found = with_extractor(|e| e.document_number(text)).unwrap();
        assert_eq!(found.value, "ABCPK1234Q");
        assert_eq!(found.strategy, Strategy::RegexSweep);
    }

    #[test]
    fn test_regex_sweep_returns_earliest() {
        let text = "first ABCPK1234Q then BCDPL5678R\n";
        let found = with_extractor(|e| e.document_number(text)).unwrap();
        assert_eq!(found.value, "ABCPK1234Q");
    }

    #[test]
    fn test_regex_sweep_orders_spaced_and_compact_hits_by_position() {
        let text = "first ABCPK 1234 Q then BCDPL5678R\n";
        let found = with_extractor(|e| e.document_number(text)).unwrap();
        assert_eq!(found.value, "ABCPK1234Q");
        assert_eq!(found.strategy, Strategy::RegexSweep);
    }

    #[test]
    fn test_sliding_window_skips_headers() {
        let text = "xxABCPKI2S4Qyy";
        let found = with_extractor(|e| e.document_number(text)).unwrap();
        assert_eq!(found.value, "ABCPK1254Q");
        assert_eq!(found.strategy, Strategy::SlidingWindow);

        let text = "INCOMETAXDEPARTMENTABCPKI2S4Q";
        assert!(with_extractor(|e| e.document_number(text)).is_none());
    }

    #[test]
    fn test_no_document_number() {
        assert!(with_extractor(|e| e.document_number("nothing useful here")).is_none());
        assert!(with_extractor(|e| e.document_number("")).is_none());
    }

    #[test]
    fn test_primary_name_before_secondary_label() {
        let text = "GOVT OF INDIA\nRAHUL SHARMA 12 XQ\nFather's Name\nSURESH SHARMA\n";
        let found = with_extractor(|e| e.primary_name(text)).unwrap();
        assert_eq!(found.value, "RAHUL SHARMA");
        assert_eq!(found.strategy, Strategy::BeforeSecondaryLabel);
    }

    #[test]
    fn test_primary_name_from_label_stops_at_other_labels() {
        let text = "Name\n12\nRohan Mehta\nDate of Birth\n";
        let found = with_extractor(|e| e.primary_name(text)).unwrap();
        assert_eq!(found.value, "ROHAN MEHTA");
        assert_eq!(found.strategy, Strategy::NameLabel);
        assert_eq!(found.distance_from_anchor, 2);

        let text = "Name\nDate of Birth\nRohan Mehta\n";
        let found = with_extractor(|e| e.primary_name(text));
        assert!(found.map_or(true, |c| c.strategy != Strategy::NameLabel));
    }

    #[test]
    fn test_primary_name_capitalised_run_fallback() {
        let text = "INCOME TAX DEPARTMENT\nxx KAVYA RAMAN yy\n";
        let found = with_extractor(|e| e.primary_name(text)).unwrap();
        assert_eq!(found.value, "KAVYA RAMAN");
        assert_eq!(found.strategy, Strategy::CapitalisedRun);
    }

    #[test]
    fn test_secondary_same_line() {
        let text = "ASHWIN BALAGURU\nFather's Name: KUMAR SWAMY\n";
        let found = with_extractor(|e| e.secondary_name(text, Some("ASHWIN BALAGURU"))).unwrap();
        assert_eq!(found.value, "KUMAR SWAMY");
        assert_eq!(found.strategy, Strategy::SameLine);
    }

    #[test]
    fn test_secondary_rejects_primary() {
        let text = "Father's Name\nASHWIN BALAGURU\n";
        let found = with_extractor(|e| e.secondary_name(text, Some("ASHWIN BALAGURU"))).unwrap();
        assert_eq!(found.value, "BALAGURU");
        assert_eq!(found.strategy, Strategy::LastWordOfPrimary);
        assert!(found.strategy.is_inferred());
    }

    #[test]
    fn test_inferred_secondary_name_is_flagged() {
        let text = "Name\nASHWIN BALAGURU\nFather's Name\nASHWIN BALAGURU\n";
        let fields = with_extractor(|e| e.extract_fields(text));
        assert_eq!(fields.primary_name.as_deref(), Some("ASHWIN BALAGURU"));
        assert_eq!(fields.secondary_name.as_deref(), Some("BALAGURU"));
        assert!(fields.secondary_name_inferred);
    }

    #[test]
    fn test_secondary_isolated_token_fallback() {
        let text = "INCOME TAX DEPARTMENT\nsome noise MAHESH more\n";
        let found = with_extractor(|e| e.secondary_name(text, None)).unwrap();
        assert_eq!(found.value, "MAHESH");
        assert_eq!(found.strategy, Strategy::IsolatedToken);
    }

    #[test]
    fn test_date_normalisation() {
        let found = with_extractor(|e| e.date_of_birth("DOB: 27-10-2004")).unwrap();
        assert_eq!(found.value, "27/10/2004");
        assert!(with_extractor(|e| e.date_of_birth("DOB: 31-02-2004")).is_none());
    }

    #[test]
    fn test_date_year_first_and_text_order() {
        let found = with_extractor(|e| e.date_of_birth("born 1990.3.7")).unwrap();
        assert_eq!(found.value, "07/03/1990");

        let found = with_extractor(|e| e.date_of_birth("1985/12/01 then 05-06-1999")).unwrap();
        assert_eq!(found.value, "01/12/1985");
    }

    #[test]
    fn test_date_out_of_range_is_discarded() {
        assert!(with_extractor(|e| e.date_of_birth("issued 01/01/2019")).is_none());
        let found = with_extractor(|e| e.date_of_birth("01/01/2019 and 02/02/1975")).unwrap();
        assert_eq!(found.value, "02/02/1975");
    }

    #[test]
    fn test_outputs_always_validate() {
        let rules = ExtractionRules::default();
        let validator = FormatValidator::new(&rules);
        let texts = [
            CARD_TEXT,
            "xxABCPKI2S4Qyy\nFather's Name: KUMAR SWAMY\n1990-05-06",
            "Name\nROHAN MEHTA\nnoise TTTT AEIOU 99/99/9999",
            "",
        ];
        for text in texts {
            let fields = with_extractor(|e| e.extract_fields(text));
            let pairs = [
                (Field::DocumentNumber, fields.document_number),
                (Field::PrimaryName, fields.primary_name),
                (Field::SecondaryName, fields.secondary_name),
                (Field::DateOfBirth, fields.date_of_birth),
            ];
            for (field, value) in pairs {
                if let Some(value) = value {
                    assert!(validator.validate_field(field, &value), "{} {:?}", field, value);
                }
            }
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let first = with_extractor(|e| e.extract_fields(CARD_TEXT));
        let second = with_extractor(|e| e.extract_fields(CARD_TEXT));
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let fields = with_extractor(|e| e.extract_fields(""));
        assert_eq!(fields, ExtractedFields::default());
    }
}
