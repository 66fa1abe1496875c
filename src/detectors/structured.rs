//! Labeled-field extraction for structured/semi-structured documents (OCR
//! output, form text): a field label followed by a colon and a value on
//! the same line is the highest-confidence signal available, since the
//! document is explicitly telling us what the value means. Spans from
//! this detector carry `Tier::Structured`, which outranks every other
//! tier in dedup.
//!
//! The other half of structured preprocessing — correcting OCR digit/letter
//! misreads before any detector runs — lives in [`crate::ocr`] and is
//! applied by the orchestrator ahead of this detector, not here.

use super::Detector;
use crate::error::Result;
use crate::model::{Span, Tier};
use once_cell::sync::Lazy;
use regex::Regex;

struct LabeledField {
    labels: &'static [&'static str],
    entity_type: &'static str,
}

const FIELDS: &[LabeledField] = &[
    LabeledField { labels: &["ssn", "social security number", "social security no"], entity_type: "SSN" },
    LabeledField { labels: &["dob", "date of birth", "birth date"], entity_type: "DATE_DOB" },
    LabeledField { labels: &["patient name", "name"], entity_type: "NAME" },
    LabeledField { labels: &["mrn", "medical record number", "medical record no"], entity_type: "MRN" },
    LabeledField { labels: &["email", "e-mail"], entity_type: "EMAIL" },
    LabeledField { labels: &["phone", "telephone", "mobile"], entity_type: "PHONE" },
    LabeledField { labels: &["address", "street address"], entity_type: "ADDRESS" },
    LabeledField { labels: &["lab test", "lab_test", "test result"], entity_type: "LAB_TEST" },
    LabeledField { labels: &["passport", "passport number", "passport no"], entity_type: "PASSPORT" },
    LabeledField { labels: &["driver license", "driver's license", "dl number"], entity_type: "DRIVER_LICENSE" },
];

fn compile_line_regex() -> Regex {
    Regex::new(r"(?im)^\s*(?P<label>[A-Za-z][A-Za-z '\-/]{1,40}?)\s*:\s*(?P<value>[^\r\n]{1,200})$")
        .expect("labeled-field line pattern failed to compile")
}

static LINE_PATTERN: Lazy<Regex> = Lazy::new(compile_line_regex);

fn entity_type_for_label(label: &str) -> Option<&'static str> {
    let lower = label.trim().to_lowercase();
    FIELDS.iter().find(|f| f.labels.iter().any(|l| *l == lower)).map(|f| f.entity_type)
}

pub struct StructuredExtractor;

impl Detector for StructuredExtractor {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();
        for caps in LINE_PATTERN.captures_iter(text) {
            let label = caps.name("label").unwrap().as_str();
            let Some(entity_type) = entity_type_for_label(label) else { continue };
            let value_match = caps.name("value").unwrap();
            let trimmed = value_match.as_str().trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let start = value_match.start();
            let end = start + trimmed.len();
            spans.push(Span::new(start, end, trimmed, entity_type, 0.97, "structured", Tier::Structured));
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_labeled_ssn_field() {
        let detector = StructuredExtractor;
        let text = "Patient Name: Jane Doe\nSSN: 123-45-6789\nDOB: 01/02/1980";
        let spans = detector.detect(text).unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "SSN" && s.text == "123-45-6789"));
        assert!(spans.iter().any(|s| s.entity_type == "DATE_DOB"));
    }

    #[test]
    fn extracts_labeled_lab_test_field() {
        let detector = StructuredExtractor;
        let spans = detector.detect("Lab Test: glucose panel, fasting").unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "LAB_TEST"));
    }

    #[test]
    fn ignores_unlabeled_lines() {
        let detector = StructuredExtractor;
        let spans = detector.detect("just some free text without a colon field").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn spans_are_consistent_with_source_text() {
        let detector = StructuredExtractor;
        let text = "Email: person@example.com";
        let spans = detector.detect(text).unwrap();
        for span in &spans {
            assert!(span.is_consistent_with(text));
        }
    }
}
