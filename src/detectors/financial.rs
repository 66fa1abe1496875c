//! Financial instrument identifiers not already covered by the checksum
//! detector's validated types: SWIFT/BIC codes, cryptocurrency addresses,
//! and LEI codes. Bitcoin and Ethereum candidates are re-validated against
//! their real checksums (base58check/bech32 for Bitcoin, EIP-55 for
//! Ethereum) the same way `ChecksumDetector` promotes or demotes candidates;
//! SWIFT/BIC and LEI have no cheap checksum, so confidence comes from
//! pattern specificity alone.

use super::{pattern::{PatternRule, PatternSet}, Detector};
use crate::checksum;
use crate::constants::MINIMAL;
use crate::error::Result;
use crate::model::{Span, Tier};
use once_cell::sync::Lazy;

static RULES: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(&[
        PatternRule { pattern: r"\b[A-Z]{6}[A-Z0-9]{2}(?:[A-Z0-9]{3})?\b", entity_type: "SWIFT_BIC", confidence: 0.55, group: 0 },
        PatternRule { pattern: r"\bbc1[a-zA-HJ-NP-Z0-9]{25,58}\b", entity_type: "BITCOIN_ADDRESS", confidence: 0.75, group: 0 },
        PatternRule { pattern: r"\b[13][A-HJ-NP-Za-km-z1-9]{25,34}\b", entity_type: "BITCOIN_ADDRESS", confidence: 0.55, group: 0 },
        PatternRule { pattern: r"\b0x[a-fA-F0-9]{40}\b", entity_type: "ETHEREUM_ADDRESS", confidence: 0.80, group: 0 },
        PatternRule { pattern: r"\b[A-Z0-9]{18}[0-9]{2}\b", entity_type: "LEI", confidence: 0.65, group: 0 },
        PatternRule {
            pattern: r"(?i)\baccount\s*(?:#|number|no\.?)?\s*:?\s*(\d{6,17})\b",
            entity_type: "ACCOUNT_NUMBER",
            confidence: 0.60,
            group: 1,
        },
    ])
});

/// SWIFT/BIC is 8 or 11 chars: 4 letters (bank), 2 letters (country), 2
/// alphanumeric (location), optionally 3 more alphanumeric (branch).
fn is_structurally_valid_bic(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() != 8 && chars.len() != 11 {
        return false;
    }
    chars[..4].iter().all(|c| c.is_ascii_alphabetic())
        && chars[4..6].iter().all(|c| c.is_ascii_alphabetic())
        && chars[6..8].iter().all(|c| c.is_ascii_alphanumeric())
}

#[derive(Clone, Copy)]
pub struct FinancialDetector;

impl Detector for FinancialDetector {
    fn name(&self) -> &'static str {
        "financial"
    }

    fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();
        for candidate in RULES.detect(text, "financial") {
            let span = match candidate.entity_type.as_str() {
                "BITCOIN_ADDRESS" => {
                    let (valid, confidence) = if candidate.text.starts_with("bc1") {
                        checksum::checksum_bitcoin_bech32(&candidate.text)
                    } else {
                        checksum::checksum_bitcoin_base58(&candidate.text)
                    };
                    if valid {
                        Some(Span { confidence, tier: Tier::Pattern, ..candidate })
                    } else {
                        None
                    }
                }
                "ETHEREUM_ADDRESS" => {
                    let (valid, confidence) = checksum::checksum_ethereum(&candidate.text);
                    if valid {
                        Some(Span { confidence, tier: Tier::Pattern, ..candidate })
                    } else {
                        None
                    }
                }
                "SWIFT_BIC" => {
                    if is_structurally_valid_bic(&candidate.text) {
                        Some(Span { tier: Tier::Pattern, ..candidate })
                    } else {
                        Some(Span { confidence: MINIMAL, tier: Tier::Pattern, ..candidate })
                    }
                }
                _ => Some(Span { tier: Tier::Pattern, ..candidate }),
            };
            if let Some(s) = span {
                spans.push(s);
            }
        }
        Ok(spans)
    }
}
