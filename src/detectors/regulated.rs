//! Regulated-sector identifiers that don't fit the government/financial
//! buckets: education records (FERPA student IDs), legal identifiers (bar
//! numbers, case numbers), and immigration identifiers (A-numbers, visa
//! numbers). Each of these is only meaningful with its label attached (a
//! bare 8-digit number is meaningless on its own), so unlike the government
//! detector's classification markings, every rule here requires a nearby
//! label rather than firing on a bare number. Export-control markings
//! (ITAR/EAR) are the government detector's concern, not this one's.

use super::{has_nearby_label, pattern::{PatternRule, PatternSet}, Detector};
use crate::error::Result;
use crate::model::{Span, Tier};
use once_cell::sync::Lazy;

const CONTEXT_RADIUS: usize = 40;

const STUDENT_LABELS: &[&str] = &["student id", "student number", "ferpa"];
const BAR_LABELS: &[&str] = &["bar number", "bar no", "attorney reg"];
const CASE_LABELS: &[&str] = &["case no", "case number", "docket"];
const TRACKING_CARRIER_LABELS: &[&str] = &["tracking number", "shipment", "carrier"];
const VISA_LABELS: &[&str] = &["visa number", "visa no", "visa #"];

static LABELED_NUMBERS: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(&[
        PatternRule { pattern: r"\b\d{6,9}\b", entity_type: "STUDENT_ID", confidence: 0.30, group: 0 },
        PatternRule { pattern: r"\b[A-Z]{0,2}\d{4,8}\b", entity_type: "BAR_NUMBER", confidence: 0.30, group: 0 },
        PatternRule { pattern: r"\b\d{1,2}:\d{2}-[a-z]{2}-\d{4,6}\b|\b[A-Z]{2}-\d{4,8}\b", entity_type: "CASE_NUMBER", confidence: 0.35, group: 0 },
        PatternRule { pattern: r"\b\d{10,22}\b", entity_type: "TRACKING_NUMBER_CARRIER", confidence: 0.25, group: 0 },
        // USCIS Alien Registration Number: "A" + 8-9 digits. Unambiguous
        // enough to report on pattern alone, no label required.
        PatternRule { pattern: r"\bA-?\d{8,9}\b", entity_type: "A_NUMBER", confidence: 0.70, group: 0 },
        PatternRule { pattern: r"\b[A-Z0-9]{8}\b", entity_type: "VISA_NUMBER", confidence: 0.25, group: 0 },
    ])
});

#[derive(Clone, Copy)]
pub struct RegulatedSectorDetector;

impl Detector for RegulatedSectorDetector {
    fn name(&self) -> &'static str {
        "regulated_sector"
    }

    fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans: Vec<Span> = Vec::new();

        for span in LABELED_NUMBERS.detect(text, "regulated_sector") {
            match span.entity_type.as_str() {
                "A_NUMBER" => {
                    spans.push(Span { tier: Tier::Pattern, ..span });
                    continue;
                }
                _ => {}
            }
            let labels: &[&str] = match span.entity_type.as_str() {
                "STUDENT_ID" => STUDENT_LABELS,
                "BAR_NUMBER" => BAR_LABELS,
                "CASE_NUMBER" => CASE_LABELS,
                "TRACKING_NUMBER_CARRIER" => TRACKING_CARRIER_LABELS,
                "VISA_NUMBER" => VISA_LABELS,
                _ => continue,
            };
            if has_nearby_label(text, span.start, span.end, labels, CONTEXT_RADIUS) {
                spans.push(Span { confidence: (span.confidence + 0.5).min(0.9), tier: Tier::Pattern, ..span });
            }
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_number_detected_without_label() {
        let detector = RegulatedSectorDetector;
        let spans = detector.detect("Alien number A123456789 on file").unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "A_NUMBER"));
    }

    #[test]
    fn labeled_visa_number_detected_bare_is_not() {
        let detector = RegulatedSectorDetector;
        let unlabeled = detector.detect("ABCD1234").unwrap();
        assert!(unlabeled.iter().all(|s| s.entity_type != "VISA_NUMBER"));

        let labeled = detector.detect("visa number: ABCD1234").unwrap();
        assert!(labeled.iter().any(|s| s.entity_type == "VISA_NUMBER"));
    }

    #[test]
    fn labeled_student_id_detected_bare_number_is_not() {
        let detector = RegulatedSectorDetector;
        let unlabeled = detector.detect("12345678").unwrap();
        assert!(unlabeled.iter().all(|s| s.entity_type != "STUDENT_ID"));

        let labeled = detector.detect("student id: 12345678").unwrap();
        assert!(labeled.iter().any(|s| s.entity_type == "STUDENT_ID"));
    }
}
