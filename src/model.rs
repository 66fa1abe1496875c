//! Core data model shared by every stage of the pipeline: spans emitted by
//! detectors, entities aggregated from spans, the normalized context/input
//! contract adapters emit, and the orchestrator's run metadata.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Quality class of a span's originating detector. Higher tiers win dedup
/// ties against lower ones regardless of confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Ml,
    Dictionary,
    Pattern,
    Structured,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Ml => "ML",
            Tier::Dictionary => "DICTIONARY",
            Tier::Pattern => "PATTERN",
            Tier::Structured => "STRUCTURED",
        };
        write!(f, "{s}")
    }
}

/// A single detection: a half-open byte range into the text it was found in,
/// the matched text itself, the canonical entity type, a confidence in
/// `[0,1]`, the detector that produced it, and that detector's tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub entity_type: String,
    pub confidence: f64,
    pub detector_name: String,
    pub tier: Tier,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        text: impl Into<String>,
        entity_type: impl Into<String>,
        confidence: f64,
        detector_name: impl Into<String>,
        tier: Tier,
    ) -> Self {
        Span {
            start,
            end,
            text: text.into(),
            entity_type: entity_type.into(),
            confidence,
            detector_name: detector_name.into(),
            tier,
        }
    }

    /// A span is well-formed only if it's non-empty and its text actually
    /// matches the range it claims, against some reference text.
    pub fn is_consistent_with(&self, original: &str) -> bool {
        if self.start >= self.end {
            return false;
        }
        match original.get(self.start..self.end) {
            Some(slice) => slice == self.text,
            None => false,
        }
    }
}

/// An aggregated finding: one or more spans of the same type from a single
/// source collapsed into a count + max confidence + accumulated positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub count: u32,
    pub confidence: f64,
    pub source: String,
    #[serde(default)]
    pub positions: Vec<(usize, usize)>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, count: u32, confidence: f64, source: impl Into<String>) -> Self {
        Entity {
            entity_type: entity_type.into(),
            count,
            confidence,
            source: source.into(),
            positions: Vec::new(),
        }
    }
}

/// Data sensitivity exposure, linearly ordered PRIVATE < INTERNAL < ORG_WIDE
/// < PUBLIC. Always validated as one of these four values — never a
/// free-form string past the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExposureLevel {
    Private,
    Internal,
    OrgWide,
    Public,
}

impl ExposureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureLevel::Private => "PRIVATE",
            ExposureLevel::Internal => "INTERNAL",
            ExposureLevel::OrgWide => "ORG_WIDE",
            ExposureLevel::Public => "PUBLIC",
        }
    }

    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        match raw.trim().to_uppercase().as_str() {
            "PRIVATE" => Ok(ExposureLevel::Private),
            "INTERNAL" => Ok(ExposureLevel::Internal),
            "ORG_WIDE" | "ORGWIDE" => Ok(ExposureLevel::OrgWide),
            "PUBLIC" => Ok(ExposureLevel::Public),
            other => Err(crate::error::OpenLabelsError::InvalidInput {
                message: format!("unknown exposure level: {other}"),
            }),
        }
    }
}

impl fmt::Display for ExposureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encryption-at-rest status of the underlying object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    None,
    Platform,
    CustomerManaged,
}

/// Per-object metadata normalized from whatever vendor surface produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedContext {
    pub exposure: ExposureLevel,
    #[serde(default = "default_encryption")]
    pub encryption: Encryption,
    #[serde(default)]
    pub versioning: bool,
    #[serde(default)]
    pub access_logging: bool,
    #[serde(default)]
    pub retention_policy: Option<String>,
    #[serde(default)]
    pub cross_account_access: bool,
    #[serde(default)]
    pub anonymous_access: bool,
    #[serde(default)]
    pub staleness_days: u32,
    #[serde(default)]
    pub has_classification: bool,
    #[serde(default)]
    pub classification_source: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub is_archive: bool,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub last_accessed: Option<String>,
}

fn default_encryption() -> Encryption {
    Encryption::None
}

impl NormalizedContext {
    pub fn new(exposure: ExposureLevel) -> Self {
        NormalizedContext {
            exposure,
            encryption: Encryption::None,
            versioning: false,
            access_logging: false,
            retention_policy: None,
            cross_account_access: false,
            anonymous_access: false,
            staleness_days: 0,
            has_classification: false,
            classification_source: None,
            path: None,
            owner: None,
            size_bytes: 0,
            file_type: None,
            is_archive: false,
            last_modified: None,
            last_accessed: None,
        }
    }
}

/// The single contract every adapter emits and every downstream stage
/// consumes: a bag of entities plus the context they were found in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedInput {
    pub entities: Vec<Entity>,
    pub context: NormalizedContext,
}

/// Risk tier a final score maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Minimal => "MINIMAL",
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
            RiskTier::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// Output of the scorer: the 0-100 score, its tier, and every multiplier
/// that went into it, carried for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub score: u8,
    pub tier: RiskTier,
    pub content_score: f64,
    pub exposure_multiplier: f64,
    pub co_occurrence_multiplier: f64,
    pub co_occurrence_rules: Vec<String>,
    pub categories: HashSet<String>,
    pub exposure: ExposureLevel,
}

/// The orchestrator's mandatory per-run report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionMetadata {
    pub detectors_run: Vec<String>,
    pub detectors_failed: Vec<String>,
    pub detectors_timed_out: Vec<String>,
    pub warnings: Vec<String>,
    pub degraded: bool,
    pub all_detectors_failed: bool,
    pub runaway_threads: u32,
}

impl DetectionMetadata {
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_consistency_checks_text_match() {
        let span = Span::new(5, 8, "SSN", "LABEL", 0.9, "test", Tier::Pattern);
        assert!(span.is_consistent_with("Label SSN here"));
        assert!(!span.is_consistent_with("completely different"));
    }

    #[test]
    fn exposure_parses_case_insensitively() {
        assert_eq!(ExposureLevel::parse("public").unwrap(), ExposureLevel::Public);
        assert_eq!(ExposureLevel::parse("Org_Wide").unwrap(), ExposureLevel::OrgWide);
        assert!(ExposureLevel::parse("nonsense").is_err());
    }

    #[test]
    fn exposure_is_linearly_ordered() {
        assert!(ExposureLevel::Private < ExposureLevel::Internal);
        assert!(ExposureLevel::Internal < ExposureLevel::OrgWide);
        assert!(ExposureLevel::OrgWide < ExposureLevel::Public);
    }
}
