//! Wraps the regex layer for entity types that have a real checksum
//! algorithm (SSN area/group/serial rules, Luhn, NPI/DEA check digits,
//! IBAN/CUSIP/ISIN/SEDOL/VIN/tracking-number check digits): find candidates
//! with a loose pattern, then replace the pattern's guessed confidence with
//! whatever the checksum validator reports. A structurally-plausible but
//! checksum-failing match is still reported at low confidence rather than
//! dropped, since typoed-but-real identifiers are common in free text.

use super::pattern::{PatternRule, PatternSet};
use super::Detector;
use crate::checksum;
use crate::constants::{LOW, MINIMAL};
use crate::error::Result;
use crate::model::{Span, Tier};
use once_cell::sync::Lazy;

static CANDIDATE_RULES: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(&[
        PatternRule { pattern: r"\b\d{3}-\d{2}-\d{4}\b", entity_type: "SSN", confidence: 0.60, group: 0 },
        PatternRule { pattern: r"\b\d{9}\b", entity_type: "SSN", confidence: 0.30, group: 0 },
        PatternRule { pattern: r"\b(?:\d[ -]*?){13,19}\b", entity_type: "CREDIT_CARD", confidence: 0.40, group: 0 },
        PatternRule { pattern: r"\b\d{10}\b", entity_type: "NPI", confidence: 0.30, group: 0 },
        PatternRule { pattern: r"\b[A-Z]{2}\d{7}\b", entity_type: "DEA", confidence: 0.40, group: 0 },
        PatternRule { pattern: r"\b[A-Z]{2}\d{2}[A-Z0-9]{10,30}\b", entity_type: "IBAN", confidence: 0.40, group: 0 },
        PatternRule { pattern: r"\b[A-HJ-NPR-Z0-9]{17}\b", entity_type: "VIN", confidence: 0.40, group: 0 },
        PatternRule { pattern: r"\b\d{9}\b", entity_type: "ABA_ROUTING", confidence: 0.25, group: 0 },
        PatternRule { pattern: r"\b1Z[A-Z0-9]{16}\b", entity_type: "UPS_TRACKING", confidence: 0.70, group: 0 },
        PatternRule { pattern: r"\b[0-9]{12}\b", entity_type: "FEDEX_TRACKING", confidence: 0.25, group: 0 },
        PatternRule { pattern: r"\b(?:94|93|92|95)\d{20}\b", entity_type: "USPS_TRACKING", confidence: 0.60, group: 0 },
        PatternRule { pattern: r"\b[A-Z0-9]{9}\b", entity_type: "CUSIP", confidence: 0.25, group: 0 },
        PatternRule { pattern: r"\b[A-Z]{2}[A-Z0-9]{9}\d\b", entity_type: "ISIN", confidence: 0.40, group: 0 },
        PatternRule { pattern: r"\b[A-Z0-9]{7}\b", entity_type: "SEDOL", confidence: 0.20, group: 0 },
    ])
});

fn validator_name(entity_type: &str) -> Option<&'static str> {
    Some(match entity_type {
        "SSN" => "ssn",
        "CREDIT_CARD" => "credit_card",
        "NPI" => "npi",
        "DEA" => "dea",
        "IBAN" => "iban",
        "VIN" => "vin",
        "ABA_ROUTING" => "aba_routing",
        "UPS_TRACKING" => "ups_tracking",
        "FEDEX_TRACKING" => "fedex_tracking",
        "USPS_TRACKING" => "usps_tracking",
        "CUSIP" => "cusip",
        "ISIN" => "isin",
        "SEDOL" => "sedol",
        _ => return None,
    })
}

fn run_validator(name: &str, value: &str) -> (bool, f64) {
    match name {
        "ssn" => checksum::checksum_ssn(value),
        "credit_card" => checksum::checksum_credit_card(value),
        "npi" => checksum::checksum_npi(value),
        "dea" => checksum::checksum_dea(value),
        "iban" => checksum::checksum_iban(value),
        "vin" => checksum::checksum_vin(value),
        "aba_routing" => checksum::checksum_aba_routing(value),
        "ups_tracking" => checksum::checksum_ups_tracking(value),
        "fedex_tracking" => checksum::checksum_fedex_tracking(value),
        "usps_tracking" => checksum::checksum_usps_tracking(value),
        "cusip" => checksum::checksum_cusip(value),
        "isin" => checksum::checksum_isin(value),
        "sedol" => checksum::checksum_sedol(value),
        _ => (false, 0.0),
    }
}

#[derive(Clone, Copy)]
pub struct ChecksumDetector;

impl Detector for ChecksumDetector {
    fn name(&self) -> &'static str {
        "checksum"
    }

    fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let candidates = CANDIDATE_RULES.detect(text, "checksum");
        let mut spans = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(validator) = validator_name(&candidate.entity_type) else { continue };
            let (valid, confidence) = run_validator(validator, &candidate.text);
            if valid {
                spans.push(Span { confidence, ..candidate });
            } else if candidate.confidence >= 0.5 {
                // structurally plausible (the loose pattern already scored
                // it reasonably) but the checksum failed: keep it around at
                // minimal confidence rather than silently dropping a typo.
                spans.push(Span { confidence: MINIMAL.min(candidate.confidence), tier: Tier::Pattern, ..candidate });
            }
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ssn_gets_high_confidence() {
        let detector = ChecksumDetector;
        let spans = detector.detect("SSN 123-45-6789 on file").unwrap();
        let ssn = spans.iter().find(|s| s.entity_type == "SSN").unwrap();
        assert!(ssn.confidence > 0.9);
    }

    #[test]
    fn invalid_area_ssn_is_dropped_or_low_confidence() {
        let detector = ChecksumDetector;
        let spans = detector.detect("000-45-6789").unwrap();
        for s in spans.iter().filter(|s| s.entity_type == "SSN") {
            assert!(s.confidence <= LOW);
        }
    }

    #[test]
    fn valid_credit_card_validates() {
        let detector = ChecksumDetector;
        let spans = detector.detect("card 4111111111111111 on order").unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "CREDIT_CARD" && s.confidence > 0.9));
    }
}
