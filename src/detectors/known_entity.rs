//! Matches a caller-supplied allowlist of known values (e.g. an
//! organization's roster of employee names, known facility names) against
//! text. Unlike the other detectors, this one isn't a fixed static table —
//! the known-entity set is per-deployment data, so the automaton is built
//! fresh from whatever the caller provides and reused across calls to
//! `detect` via the owning struct.
//!
//! Matching is exact-case and word-boundary respecting, except that a
//! multi-word value (`"Jane Doe"`) also registers its individual words
//! (`"Jane"`, `"Doe"`) as standalone patterns, so a later message that only
//! repeats the first name still gets tagged.

use super::Detector;
use crate::error::Result;
use crate::model::{Span, Tier};
use aho_corasick::{AhoCorasick, MatchKind};

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub struct KnownEntityDetector {
    automaton: AhoCorasick,
    entity_types: Vec<String>,
}

impl KnownEntityDetector {
    /// `entries` is `(value, entity_type)` pairs, e.g. `("Jane Doe", "NAME")`.
    pub fn new(entries: &[(&str, &str)]) -> Self {
        let mut values: Vec<&str> = Vec::new();
        let mut entity_types: Vec<String> = Vec::new();
        for (value, entity_type) in entries {
            values.push(value);
            entity_types.push(entity_type.to_string());
            if value.contains(' ') {
                for word in value.split(' ').filter(|w| !w.is_empty()) {
                    values.push(word);
                    entity_types.push(entity_type.to_string());
                }
            }
        }
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(false)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&values)
            .expect("known-entity list failed to compile into an Aho-Corasick automaton");
        KnownEntityDetector { automaton, entity_types }
    }

    pub fn empty() -> Self {
        KnownEntityDetector::new(&[])
    }
}

impl Detector for KnownEntityDetector {
    fn name(&self) -> &'static str {
        "known_entity"
    }

    fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let bytes = text.as_bytes();
        let mut spans = Vec::new();
        for m in self.automaton.find_iter(text) {
            let before_is_word = m.start() > 0 && is_word_byte(bytes[m.start() - 1]);
            let after_is_word = m.end() < bytes.len() && is_word_byte(bytes[m.end()]);
            if before_is_word || after_is_word {
                continue;
            }
            let entity_type = &self.entity_types[m.pattern().as_usize()];
            spans.push(Span::new(m.start(), m.end(), &text[m.start()..m.end()], entity_type.clone(), 0.98, "known_entity", Tier::Structured));
        }
        Ok(spans)
    }

    fn is_available(&self) -> bool {
        !self.entity_types.is_empty()
    }
}
