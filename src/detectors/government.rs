//! Government/military identifiers: classification markings, DoD/GSA
//! contract numbers, CAGE codes, UEIs, and military IDs. Classification
//! markings are high-confidence on pattern alone; contract-shaped numbers
//! are common in ordinary business text, so they only count once they sit
//! within `CONTEXT_RADIUS` characters of a qualifying label.

use super::{has_nearby_label, pattern::{PatternRule, PatternSet}, Detector};
use crate::error::Result;
use crate::model::{Span, Tier};
use once_cell::sync::Lazy;

const CONTEXT_RADIUS: usize = 50;

const CONTRACT_LABELS: &[&str] = &["contract", "dod", "gsa", "solicitation", "award", "task order"];
const MILITARY_ID_LABELS: &[&str] = &["military id", "dod id", "edipi", "service member"];
const DUNS_LABELS: &[&str] = &["duns", "d-u-n-s", "dun & bradstreet"];
/// Context keywords that disambiguate a bare `SECRET` or `CUI` from the
/// common English word/acronym collision.
const CLASSIFICATION_CONTEXT_LABELS: &[&str] =
    &["//", "classified", "clearance", "noforn", "portion", "marking"];

static RULES: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(&[
        PatternRule {
            pattern: r"\bTOP SECRET(?://[A-Z/ ]+)?\b|\bCONFIDENTIAL(?://[A-Z/ ]+)?\b|\bUNCLASSIFIED(?://[A-Z/ ]+)?\b",
            entity_type: "CLASSIFICATION_LEVEL",
            confidence: 0.95,
            group: 0,
        },
        PatternRule {
            pattern: r"\bSECRET(?://[A-Z/ ]+)?\b",
            entity_type: "CLASSIFICATION_LEVEL_AMBIGUOUS",
            confidence: 0.60,
            group: 0,
        },
        PatternRule {
            pattern: r"\bCUI\b",
            entity_type: "CLASSIFICATION_LEVEL_AMBIGUOUS",
            confidence: 0.50,
            group: 0,
        },
        PatternRule {
            pattern: r"(?i)\bNOFORN\b|\bORCON\b|\bRELIDO\b|\bPROPIN\b|\bREL TO\b|\bFVEY\b",
            entity_type: "DISSEMINATION_CONTROL",
            confidence: 0.95,
            group: 0,
        },
        PatternRule {
            pattern: r"//(?:SI|TK|HCS)(?:-[A-Z]+)?\b",
            entity_type: "SCI_COMPARTMENT",
            confidence: 0.90,
            group: 0,
        },
        PatternRule {
            pattern: r"\bFA\d{4}-\d{2}-[A-Z]-\d{4}\b|\bW\d{2}[A-Z]{2}[A-Z0-9]-\d{2}-[A-Z]-\d{4}\b",
            entity_type: "DOD_CONTRACT",
            confidence: 0.70,
            group: 0,
        },
        PatternRule {
            pattern: r"\bGS-\d{2}[A-Z]-\d{4}[A-Z]\b",
            entity_type: "GSA_CONTRACT",
            confidence: 0.70,
            group: 0,
        },
        PatternRule { pattern: r"\b[0-9A-Z]{5}\b", entity_type: "CAGE_CODE", confidence: 0.20, group: 0 },
        PatternRule { pattern: r"\b[A-Z0-9]{12}\b", entity_type: "UEI", confidence: 0.20, group: 0 },
        PatternRule { pattern: r"\b\d{9}\b", entity_type: "DUNS_NUMBER", confidence: 0.20, group: 0 },
        PatternRule { pattern: r"\b\d{10}\b", entity_type: "MILITARY_ID", confidence: 0.25, group: 0 },
        PatternRule {
            pattern: r"(?i)\b(?:top secret|secret|confidential)\s+clearance\b|\bTS/SCI\b|\bclearance\s+level\s*:?\s*(?:top secret|secret|confidential)\b",
            entity_type: "CLEARANCE_LEVEL",
            confidence: 0.85,
            group: 0,
        },
        PatternRule {
            pattern: r"(?i)\bITAR[- ]controlled\b|\bsubject to ITAR\b|\bEAR99\b|\bexport controlled?\b.{0,20}\b(?:ITAR|EAR)\b",
            entity_type: "EXPORT_CONTROL_MARKING",
            confidence: 0.80,
            group: 0,
        },
    ])
});

/// True when `text[..start]` ends in `"TOP "` — i.e. this `SECRET` match is
/// really part of a `TOP SECRET` marking the unambiguous rule already caught.
fn preceded_by_top(text: &str, start: usize) -> bool {
    start >= 4 && text.get(start - 4..start).map(|s| s.eq_ignore_ascii_case("top ")).unwrap_or(false)
}

#[derive(Clone, Copy)]
pub struct GovernmentDetector;

impl Detector for GovernmentDetector {
    fn name(&self) -> &'static str {
        "government"
    }

    fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let candidates = RULES.detect(text, "government");
        let mut spans = Vec::with_capacity(candidates.len());

        for span in candidates {
            match span.entity_type.as_str() {
                "CLASSIFICATION_LEVEL" | "DISSEMINATION_CONTROL" | "SCI_COMPARTMENT" => {
                    spans.push(Span { tier: Tier::Pattern, ..span })
                }
                "CLASSIFICATION_LEVEL_AMBIGUOUS"
                    if !preceded_by_top(text, span.start)
                        && has_nearby_label(text, span.start, span.end, CLASSIFICATION_CONTEXT_LABELS, CONTEXT_RADIUS) =>
                {
                    spans.push(Span {
                        entity_type: "CLASSIFICATION_LEVEL".to_string(),
                        confidence: (span.confidence + 0.3).min(0.9),
                        tier: Tier::Pattern,
                        ..span
                    });
                }
                "DOD_CONTRACT" | "GSA_CONTRACT" | "CLEARANCE_LEVEL" | "EXPORT_CONTROL_MARKING" => {
                    spans.push(Span { tier: Tier::Pattern, ..span })
                }
                "CAGE_CODE" | "UEI" if has_nearby_label(text, span.start, span.end, CONTRACT_LABELS, CONTEXT_RADIUS) => {
                    spans.push(Span { confidence: (span.confidence + 0.5).min(0.9), tier: Tier::Pattern, ..span });
                }
                "DUNS_NUMBER" if has_nearby_label(text, span.start, span.end, DUNS_LABELS, CONTEXT_RADIUS) => {
                    spans.push(Span { confidence: (span.confidence + 0.55).min(0.9), tier: Tier::Pattern, ..span });
                }
                "MILITARY_ID" if has_nearby_label(text, span.start, span.end, MILITARY_ID_LABELS, CONTEXT_RADIUS) => {
                    spans.push(Span { confidence: (span.confidence + 0.55).min(0.9), tier: Tier::Pattern, ..span });
                }
                _ => {}
            }
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_classification_marking_is_reported() {
        let detector = GovernmentDetector;
        let spans = detector.detect("This document is marked TOP SECRET//NOFORN").unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "CLASSIFICATION_LEVEL"));
        assert!(spans.iter().any(|s| s.entity_type == "DISSEMINATION_CONTROL"));
    }

    #[test]
    fn bare_secret_requires_nearby_classification_context() {
        let detector = GovernmentDetector;
        let without_context = detector.detect("the band's new single is called SECRET and drops Friday").unwrap();
        assert!(without_context.iter().all(|s| s.entity_type != "CLASSIFICATION_LEVEL"));

        let with_context = detector.detect("portion marking: SECRET//NOFORN applies here").unwrap();
        assert!(with_context.iter().any(|s| s.entity_type == "CLASSIFICATION_LEVEL"));
    }

    #[test]
    fn bare_cui_requires_nearby_classification_context() {
        let detector = GovernmentDetector;
        let without_context = detector.detect("the CUI team meets on Tuesdays").unwrap();
        assert!(without_context.iter().all(|s| s.entity_type != "CLASSIFICATION_LEVEL"));

        let with_context = detector.detect("this record is classified CUI per policy").unwrap();
        assert!(with_context.iter().any(|s| s.entity_type == "CLASSIFICATION_LEVEL"));
    }

    #[test]
    fn cage_code_requires_nearby_contract_label() {
        let detector = GovernmentDetector;
        let without_context = detector.detect("reference 1A2B3 for pickup").unwrap();
        assert!(without_context.iter().all(|s| s.entity_type != "CAGE_CODE"));

        let with_context = detector.detect("DoD contract CAGE code 1A2B3 applies").unwrap();
        assert!(with_context.iter().any(|s| s.entity_type == "CAGE_CODE"));
    }

    #[test]
    fn duns_number_requires_nearby_label() {
        let detector = GovernmentDetector;
        let without_context = detector.detect("order 123456789 shipped today").unwrap();
        assert!(without_context.iter().all(|s| s.entity_type != "DUNS_NUMBER"));

        let with_context = detector.detect("DUNS number: 123456789").unwrap();
        assert!(with_context.iter().any(|s| s.entity_type == "DUNS_NUMBER"));
    }

    #[test]
    fn clearance_level_detected() {
        let detector = GovernmentDetector;
        let spans = detector.detect("Candidate holds an active TOP SECRET clearance").unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "CLEARANCE_LEVEL"));
    }

    #[test]
    fn export_control_marking_detected() {
        let detector = GovernmentDetector;
        let spans = detector.detect("This drawing is ITAR-controlled and may not leave the US").unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "EXPORT_CONTROL_MARKING"));
    }
}
