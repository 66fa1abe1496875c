//! Risk scoring: turns a bag of entity counts plus an exposure level into a
//! single 0-100 score and risk tier.
//!
//! ```text
//! content_score  = Σ over entity types of weight(type) * WEIGHT_SCALE
//!                    * log2(1 + count) * confidence
//! content_score *= co_occurrence_multiplier          (capped at 100)
//! final_score    = content_score * exposure_multiplier (capped at 100)
//! ```
//!
//! The co-occurrence multiplier rewards combinations of entity categories
//! that are riskier together than apart (e.g. a direct identifier sitting
//! next to health information). When more than one rule's categories are
//! all present, the rule with the highest multiplier wins; rules tied on
//! multiplier are all reported.

use crate::model::{NormalizedContext, NormalizedInput, RiskTier, ScoringResult};
use crate::registry::Registry;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

const WEIGHT_SCALE: f64 = 4.0;

const TIER_CRITICAL: u8 = 80;
const TIER_HIGH: u8 = 60;
const TIER_MEDIUM: u8 = 40;
const TIER_LOW: u8 = 20;

fn exposure_multiplier(exposure: crate::model::ExposureLevel) -> f64 {
    use crate::model::ExposureLevel::*;
    match exposure {
        Private => 1.0,
        Internal => 1.25,
        OrgWide => 1.75,
        Public => 2.5,
    }
}

struct CoOccurrenceRule {
    categories: &'static [&'static str],
    multiplier: f64,
    name: &'static str,
}

/// Supplementary co-occurrence rules beyond the two canonical examples
/// (HIPAA-style identifier+health-info, and a bare credential hit): these
/// are not exhaustive, just the combinations worth calling out by name.
static CO_OCCURRENCE_RULES: Lazy<Vec<CoOccurrenceRule>> = Lazy::new(|| {
    vec![
        CoOccurrenceRule { categories: &["direct_identifier", "health_info"], multiplier: 2.0, name: "hipaa_phi" },
        CoOccurrenceRule { categories: &["credential"], multiplier: 1.5, name: "credential_exposure" },
        CoOccurrenceRule { categories: &["quasi_identifier", "health_info"], multiplier: 1.5, name: "phi_without_id" },
        CoOccurrenceRule { categories: &["contact", "health_info"], multiplier: 1.4, name: "phi_with_contact" },
        CoOccurrenceRule {
            categories: &["direct_identifier", "quasi_identifier", "financial"],
            multiplier: 2.2,
            name: "full_identity",
        },
        CoOccurrenceRule { categories: &["classification_marking"], multiplier: 2.5, name: "classified_data" },
        CoOccurrenceRule { categories: &["direct_identifier", "financial"], multiplier: 1.8, name: "identity_theft" },
        CoOccurrenceRule { categories: &["direct_identifier", "contact"], multiplier: 1.25, name: "pii_bundle" },
    ]
});

fn score_to_tier(score: u8) -> RiskTier {
    if score >= TIER_CRITICAL {
        RiskTier::Critical
    } else if score >= TIER_HIGH {
        RiskTier::High
    } else if score >= TIER_MEDIUM {
        RiskTier::Medium
    } else if score >= TIER_LOW {
        RiskTier::Low
    } else {
        RiskTier::Minimal
    }
}

fn categories_present(registry: &Registry, counts: &HashMap<String, u32>) -> HashSet<String> {
    counts.keys().map(|ty| registry.get_category(ty)).filter(|c| c.as_str() != "unknown").collect()
}

/// Highest-multiplier rule whose every required category is present wins;
/// ties on multiplier are all reported together.
fn co_occurrence_multiplier(categories: &HashSet<String>) -> (f64, Vec<String>) {
    let mut best_mult = 1.0f64;
    let mut best_rules: Vec<String> = Vec::new();

    for rule in CO_OCCURRENCE_RULES.iter() {
        let satisfied = rule.categories.iter().all(|c| categories.contains(*c));
        if !satisfied {
            continue;
        }
        if rule.multiplier > best_mult {
            best_mult = rule.multiplier;
            best_rules = vec![rule.name.to_string()];
        } else if (rule.multiplier - best_mult).abs() < f64::EPSILON {
            best_rules.push(rule.name.to_string());
        }
    }

    (best_mult, best_rules)
}

/// Score a `type -> count` tally under the given exposure and a single
/// confidence figure applied uniformly (the common case: one detector run,
/// one aggregate confidence for the whole document).
pub fn score_entities(
    registry: &Registry,
    counts: &HashMap<String, u32>,
    exposure: crate::model::ExposureLevel,
    confidence: f64,
) -> ScoringResult {
    if counts.is_empty() {
        return ScoringResult {
            score: 0,
            tier: RiskTier::Minimal,
            content_score: 0.0,
            exposure_multiplier: 1.0,
            co_occurrence_multiplier: 1.0,
            co_occurrence_rules: vec![],
            categories: HashSet::new(),
            exposure,
        };
    }

    let mut base_score = 0.0f64;
    for (entity_type, &count) in counts {
        let weight = registry.get_weight(entity_type) as f64 * WEIGHT_SCALE;
        let aggregation = (1.0 + count.max(1) as f64).log2();
        base_score += weight * aggregation * confidence;
    }

    let categories = categories_present(registry, counts);
    let (co_mult, co_rules) = co_occurrence_multiplier(&categories);
    let content_score = (base_score * co_mult).min(100.0);

    let exp_mult = exposure_multiplier(exposure);
    let final_score = (content_score * exp_mult).min(100.0);
    let score = final_score.round().clamp(0.0, 100.0) as u8;

    ScoringResult {
        score,
        tier: score_to_tier(score),
        content_score: (content_score * 10.0).round() / 10.0,
        exposure_multiplier: exp_mult,
        co_occurrence_multiplier: co_mult,
        co_occurrence_rules: co_rules,
        categories,
        exposure,
    }
}

/// Score raw text: callers that already ran detection and just want a
/// score from entity counts should use `score_entities` directly; this
/// entry point exists for callers holding a merged counts map plus a
/// bare exposure string.
pub fn score_text(registry: &Registry, counts: &HashMap<String, u32>, exposure_raw: &str, confidence: f64) -> crate::error::Result<ScoringResult> {
    let exposure = crate::model::ExposureLevel::parse(exposure_raw)?;
    Ok(score_entities(registry, counts, exposure, confidence))
}

/// Score a normalized input (entities + context) end to end, taking each
/// entity's own confidence rather than a single uniform figure: the
/// content score sums each entity's individually-weighted contribution.
pub fn score_from_adapters(registry: &Registry, input: &NormalizedInput) -> ScoringResult {
    if input.entities.is_empty() {
        return ScoringResult {
            score: 0,
            tier: RiskTier::Minimal,
            content_score: 0.0,
            exposure_multiplier: 1.0,
            co_occurrence_multiplier: 1.0,
            co_occurrence_rules: vec![],
            categories: HashSet::new(),
            exposure: input.context.exposure,
        };
    }

    let mut base_score = 0.0f64;
    let mut counts: HashMap<String, u32> = HashMap::new();
    for e in &input.entities {
        let weight = registry.get_weight(&e.entity_type) as f64 * WEIGHT_SCALE;
        let aggregation = (1.0 + e.count.max(1) as f64).log2();
        base_score += weight * aggregation * e.confidence;
        *counts.entry(e.entity_type.clone()).or_insert(0) += e.count;
    }

    let categories = categories_present(registry, &counts);
    let (co_mult, co_rules) = co_occurrence_multiplier(&categories);
    let content_score = (base_score * co_mult).min(100.0);

    let exp_mult = exposure_multiplier(input.context.exposure);
    let final_score = (content_score * exp_mult).min(100.0);
    let score = final_score.round().clamp(0.0, 100.0) as u8;

    ScoringResult {
        score,
        tier: score_to_tier(score),
        content_score: (content_score * 10.0).round() / 10.0,
        exposure_multiplier: exp_mult,
        co_occurrence_multiplier: co_mult,
        co_occurrence_rules: co_rules,
        categories,
        exposure: input.context.exposure,
    }
}

/// Score a file-level context: same as `score_from_adapters`, exposed
/// separately so callers working in terms of a path rather than an
/// already-built `NormalizedInput` have a name that matches their mental
/// model. `context` is accepted for symmetry with the other entry points
/// even though only its exposure currently participates in scoring.
pub fn score_file(registry: &Registry, counts: &HashMap<String, u32>, context: &NormalizedContext, confidence: f64) -> ScoringResult {
    score_entities(registry, counts, context.exposure, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, ExposureLevel};

    fn registry() -> Registry {
        Registry::with_base_only()
    }

    #[test]
    fn empty_entities_score_zero() {
        let result = score_entities(&registry(), &HashMap::new(), ExposureLevel::Private, 0.85);
        assert_eq!(result.score, 0);
        assert_eq!(result.tier, RiskTier::Minimal);
    }

    #[test]
    fn public_exposure_scores_higher_than_private() {
        let mut counts = HashMap::new();
        counts.insert("SSN".to_string(), 1);
        let reg = registry();
        let private = score_entities(&reg, &counts, ExposureLevel::Private, 0.85);
        let public = score_entities(&reg, &counts, ExposureLevel::Public, 0.85);
        assert!(public.score >= private.score);
    }

    #[test]
    fn hipaa_combination_triggers_co_occurrence_rule() {
        let mut counts = HashMap::new();
        counts.insert("SSN".to_string(), 1);
        counts.insert("DIAGNOSIS".to_string(), 1);
        let result = score_entities(&registry(), &counts, ExposureLevel::Private, 0.9);
        assert!(result.co_occurrence_rules.contains(&"hipaa_phi".to_string()));
        assert!(result.co_occurrence_multiplier > 1.0);
    }

    #[test]
    fn higher_count_increases_score_but_sublinearly() {
        let reg = registry();
        let mut one = HashMap::new();
        one.insert("EMAIL".to_string(), 1);
        let mut many = HashMap::new();
        many.insert("EMAIL".to_string(), 100);
        let score_one = score_entities(&reg, &one, ExposureLevel::Private, 0.9).content_score;
        let score_many = score_entities(&reg, &many, ExposureLevel::Private, 0.9).content_score;
        assert!(score_many > score_one);
    }

    #[test]
    fn score_from_adapters_matches_counts_based_scoring_for_uniform_confidence() {
        let reg = registry();
        let mut ctx = NormalizedContext::new(ExposureLevel::Internal);
        ctx.exposure = ExposureLevel::Internal;
        let input = NormalizedInput {
            entities: vec![Entity::new("SSN", 1, 0.85, "test")],
            context: ctx,
        };
        let from_adapters = score_from_adapters(&reg, &input);
        let mut counts = HashMap::new();
        counts.insert("SSN".to_string(), 1);
        let from_counts = score_entities(&reg, &counts, ExposureLevel::Internal, 0.85);
        assert_eq!(from_adapters.score, from_counts.score);
    }

    #[test]
    fn direct_identifier_with_contact_triggers_pii_bundle_rule() {
        let mut counts = HashMap::new();
        counts.insert("SSN".to_string(), 1);
        counts.insert("EMAIL".to_string(), 1);
        let result = score_entities(&registry(), &counts, ExposureLevel::Private, 0.9);
        assert!(result.co_occurrence_rules.contains(&"pii_bundle".to_string()));
    }

    #[test]
    fn scores_never_exceed_one_hundred() {
        let reg = registry();
        let mut counts = HashMap::new();
        counts.insert("SSN".to_string(), 1000);
        counts.insert("CREDIT_CARD".to_string(), 1000);
        let result = score_entities(&reg, &counts, ExposureLevel::Public, 1.0);
        assert!(result.score <= 100);
    }
}
