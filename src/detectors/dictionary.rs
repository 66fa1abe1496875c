//! Exact-match dictionary lookups: diagnosis/medication vocabularies and
//! similar closed term lists where a regex would be both slower and less
//! precise than literal matching. Built on Aho-Corasick so the whole
//! dictionary (however large) is scanned in a single linear pass, with a
//! built-in term set covering diagnoses, medications, lab tests,
//! facilities, payers, and professions. Extra terms can be layered in from
//! `<data_dir>/dictionaries/*.txt` (one term per line, `#`-prefixed
//! comments, case-folded), the same overlay pattern the registry uses for
//! weight overrides.

use super::Detector;
use crate::constants::MEDIUM;
use crate::error::Result;
use crate::model::{Span, Tier};
use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Matches on these terms alone are almost always false positives: they're
/// substrings of the real vocabulary ("mental **health**", "**support**
/// group") but carry no signal standing alone.
const DENY_LIST: &[&str] = &["health", "support", "care", "services", "center", "group", "clinic"];

/// Caps how many matches a single term contributes to one `detect()` call.
/// An adversarial input repeating a dictionary term thousands of times
/// would otherwise force an unbounded `Vec<Span>` allocation.
const PER_TERM_MATCH_CAP: usize = 100;

struct DictionaryEntry {
    term: String,
    entity_type: String,
}

const BUILTIN: &[(&str, &str)] = &[
    ("diabetes mellitus", "DIAGNOSIS"),
    ("type 2 diabetes", "DIAGNOSIS"),
    ("hypertension", "DIAGNOSIS"),
    ("major depressive disorder", "DIAGNOSIS"),
    ("hiv positive", "DIAGNOSIS"),
    ("bipolar disorder", "DIAGNOSIS"),
    ("schizophrenia", "DIAGNOSIS"),
    ("chronic kidney disease", "DIAGNOSIS"),
    ("congestive heart failure", "DIAGNOSIS"),
    ("metformin", "MEDICATION"),
    ("lisinopril", "MEDICATION"),
    ("sertraline", "MEDICATION"),
    ("oxycodone", "MEDICATION"),
    ("fentanyl", "MEDICATION"),
    ("atorvastatin", "MEDICATION"),
    ("methadone", "MEDICATION"),
    ("hemoglobin a1c", "LAB_TEST"),
    ("complete blood count", "LAB_TEST"),
    ("lipid panel", "LAB_TEST"),
    ("basic metabolic panel", "LAB_TEST"),
    ("urinalysis", "LAB_TEST"),
    ("psychiatric facility", "FACILITY"),
    ("rehabilitation center", "FACILITY"),
    ("methadone clinic", "FACILITY"),
    ("memorial hospital", "FACILITY"),
    ("mayo clinic", "FACILITY"),
    ("blue cross blue shield", "PAYER"),
    ("unitedhealthcare", "PAYER"),
    ("medicaid", "PAYER"),
    ("medicare", "PAYER"),
    ("aetna", "PAYER"),
    ("cigna", "PAYER"),
    ("psychiatrist", "PROFESSION"),
    ("oncologist", "PROFESSION"),
    ("social worker", "PROFESSION"),
    ("substance abuse counselor", "PROFESSION"),
    ("san francisco", "CITY"),
    ("new york city", "CITY"),
];

fn load_overlay_file(path: &std::path::Path, entity_type: &str, out: &mut Vec<DictionaryEntry>) {
    let Ok(contents) = std::fs::read_to_string(path) else { return };
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        out.push(DictionaryEntry { term: trimmed.to_lowercase(), entity_type: entity_type.to_string() });
    }
}

/// Looks for `<data_dir>/dictionaries/<entity_type>.txt` files and appends
/// any terms found to the built-in set. `<data_dir>` resolution mirrors
/// `Config::from_env`'s `OPENLABELS_SCANNER_HOME`, since this static is
/// built before any particular request's `Context` exists.
fn load_entries() -> Vec<DictionaryEntry> {
    let mut entries: Vec<DictionaryEntry> =
        BUILTIN.iter().map(|(term, ty)| DictionaryEntry { term: term.to_string(), entity_type: ty.to_string() }).collect();

    let data_dir = std::env::var("OPENLABELS_SCANNER_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| crate::config::default_data_dir());
    let dictionaries_dir = data_dir.join("dictionaries");
    for (file_stem, entity_type) in &[
        ("diagnoses", "DIAGNOSIS"),
        ("medications", "MEDICATION"),
        ("lab_tests", "LAB_TEST"),
        ("facilities", "FACILITY"),
        ("payers", "PAYER"),
        ("professions", "PROFESSION"),
        ("geographic", "CITY"),
    ] {
        load_overlay_file(&dictionaries_dir.join(format!("{file_stem}.txt")), entity_type, &mut entries);
    }
    entries
}

struct Dictionary {
    automaton: AhoCorasick,
    entries: Vec<DictionaryEntry>,
}

static DICTIONARY: Lazy<Dictionary> = Lazy::new(|| {
    let entries = load_entries();
    let terms: Vec<&str> = entries.iter().map(|e| e.term.as_str()).collect();
    let automaton = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(&terms)
        .expect("dictionary failed to compile into an Aho-Corasick automaton");
    Dictionary { automaton, entries }
});

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// True if `idx` is not in the middle of a word in `text` — i.e. either the
/// string boundary, or the byte there isn't a word character.
fn is_word_boundary(text: &str, idx: usize) -> bool {
    match text.as_bytes().get(idx) {
        None => true,
        Some(&b) => !is_word_byte(b),
    }
}

#[derive(Clone, Copy)]
pub struct DictionaryDetector;

impl Detector for DictionaryDetector {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();
        let mut per_term_count: HashMap<usize, usize> = HashMap::new();

        for m in DICTIONARY.automaton.find_iter(text) {
            let pattern_idx = m.pattern().as_usize();
            let entry = &DICTIONARY.entries[pattern_idx];

            let matched = &text[m.start()..m.end()];
            if DENY_LIST.iter().any(|d| matched.eq_ignore_ascii_case(d)) {
                continue;
            }

            // word-boundary check on both sides: "diabetes" inside
            // "prediabetes" shouldn't count as a standalone diagnosis hit.
            let left_ok = m.start() == 0 || is_word_boundary(text, m.start() - 1);
            if !left_ok || !is_word_boundary(text, m.end()) {
                continue;
            }

            let count = per_term_count.entry(pattern_idx).or_insert(0);
            if *count >= PER_TERM_MATCH_CAP {
                continue;
            }
            *count += 1;

            spans.push(Span::new(m.start(), m.end(), matched, entry.entity_type.as_str(), MEDIUM, "dictionary", Tier::Dictionary));
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_diagnosis_case_insensitively() {
        let detector = DictionaryDetector;
        let spans = detector.detect("Patient has Diabetes Mellitus and takes Metformin").unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "DIAGNOSIS"));
        assert!(spans.iter().any(|s| s.entity_type == "MEDICATION"));
    }

    #[test]
    fn no_match_on_unrelated_text() {
        let detector = DictionaryDetector;
        let spans = detector.detect("The weather is nice today").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn word_boundary_rejects_substring_match() {
        let detector = DictionaryDetector;
        let spans = detector.detect("the prediabetes mellitus screening was inconclusive").unwrap();
        assert!(spans.iter().all(|s| s.entity_type != "DIAGNOSIS"));
    }

    #[test]
    fn lab_test_and_payer_and_profession_are_detected() {
        let detector = DictionaryDetector;
        let spans = detector
            .detect("Ordered a Complete Blood Count, billed through Medicaid, reviewed by an Oncologist")
            .unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "LAB_TEST"));
        assert!(spans.iter().any(|s| s.entity_type == "PAYER"));
        assert!(spans.iter().any(|s| s.entity_type == "PROFESSION"));
    }

    #[test]
    fn deny_listed_bare_term_is_suppressed() {
        let detector = DictionaryDetector;
        let spans = detector.detect("support").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn per_term_match_cap_bounds_repeated_hits() {
        let detector = DictionaryDetector;
        let text = "metformin ".repeat(500);
        let spans = detector.detect(&text).unwrap();
        let count = spans.iter().filter(|s| s.entity_type == "MEDICATION").count();
        assert!(count <= PER_TERM_MATCH_CAP);
    }
}
