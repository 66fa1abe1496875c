//! Combines entity findings and context from multiple adapters/sources into
//! a single `MergeResult`, with composable primitives for callers that only
//! need one part of the merge (e.g. just the highest exposure across a set
//! of contexts).

use crate::model::{Entity, ExposureLevel, NormalizedContext, NormalizedInput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reported confidence for a merge that produced zero entities. Reporting
/// 0.0 here would read as "detected nothing with total certainty", which is
/// the wrong signal — an empty merge is simply uninformative.
pub const CONFIDENCE_WHEN_NO_SPANS: f64 = 0.0;

pub const EXPOSURE_ORDER: [ExposureLevel; 4] = [
    ExposureLevel::Private,
    ExposureLevel::Internal,
    ExposureLevel::OrgWide,
    ExposureLevel::Public,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// Default. Per type: `count = max(counts)`, `confidence = max(confidences)`.
    ConservativeUnion,
    /// Per type: `count = sum(counts)`, `confidence = max(confidences)`.
    SumCounts,
    /// The first input's values for a type win outright; later inputs only
    /// contribute types the first input never saw.
    FirstWins,
}

/// One entity after merging, carrying which sources contributed and the
/// union of observed positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedEntity {
    pub entity_type: String,
    pub count: u32,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub positions: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    pub entities: Vec<MergedEntity>,
    pub context: NormalizedContext,
}

impl MergeResult {
    pub fn get_entity(&self, entity_type: &str) -> Option<&MergedEntity> {
        self.entities.iter().find(|e| e.entity_type == entity_type)
    }

    pub fn has_entity(&self, entity_type: &str) -> bool {
        self.get_entity(entity_type).is_some()
    }
}

/// Highest exposure among a set of contexts — the combined object is at
/// least as exposed as its most exposed constituent.
pub fn get_highest_exposure(contexts: &[&NormalizedContext]) -> ExposureLevel {
    contexts
        .iter()
        .map(|c| c.exposure)
        .max()
        .unwrap_or(ExposureLevel::Private)
}

/// Merge contexts by taking the highest exposure, OR-ing every boolean risk
/// flag, and the minimum staleness (most recently refreshed source wins).
pub fn merge_contexts(contexts: &[&NormalizedContext]) -> NormalizedContext {
    if contexts.is_empty() {
        return NormalizedContext::new(ExposureLevel::Private);
    }
    let exposure = get_highest_exposure(contexts);
    let mut merged = NormalizedContext::new(exposure);
    merged.encryption = contexts
        .iter()
        .map(|c| c.encryption)
        .min_by_key(|e| match e {
            crate::model::Encryption::None => 0,
            crate::model::Encryption::Platform => 1,
            crate::model::Encryption::CustomerManaged => 2,
        })
        .unwrap_or(crate::model::Encryption::None);
    merged.versioning = contexts.iter().all(|c| c.versioning);
    merged.access_logging = contexts.iter().all(|c| c.access_logging);
    merged.cross_account_access = contexts.iter().any(|c| c.cross_account_access);
    merged.anonymous_access = contexts.iter().any(|c| c.anonymous_access);
    merged.has_classification = contexts.iter().any(|c| c.has_classification);
    merged.staleness_days = contexts.iter().map(|c| c.staleness_days).min().unwrap_or(0);
    merged
}

/// Interval-merges a position list: sort by start, then fold any pair
/// `[a,b]` and `[c,d]` with `c <= b` into `[a, max(b,d)]`.
pub fn deduplicate_positions(mut positions: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    if positions.is_empty() {
        return positions;
    }
    positions.sort_unstable_by_key(|&(start, _)| start);
    let mut result: Vec<(usize, usize)> = Vec::with_capacity(positions.len());
    for (start, end) in positions {
        match result.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => result.push((start, end)),
        }
    }
    result
}

/// Flatten entities into a `type -> count` tally, summing counts for
/// repeated types.
pub fn entities_to_counts(entities: &[Entity]) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for e in entities {
        *counts.entry(e.entity_type.clone()).or_insert(0) += e.count;
    }
    counts
}

/// Inverse of `entities_to_counts`: synthesize entities from a tally, using
/// a fixed confidence since counts alone carry no confidence information.
pub fn counts_to_entities(counts: &HashMap<String, u32>, confidence: f64, source: &str) -> Vec<Entity> {
    counts
        .iter()
        .map(|(ty, &count)| Entity::new(ty.clone(), count, confidence, source))
        .collect()
}

/// Merge entity lists from multiple sources under the given strategy.
/// `FIRST_WINS` keeps the first source's count/confidence outright for any
/// type it already has; later sources only ever contribute brand-new types.
pub fn merge_entities(sources: &[(&str, &[Entity])], strategy: MergeStrategy) -> Vec<MergedEntity> {
    let mut by_type: HashMap<String, MergedEntity> = HashMap::new();

    for (source_name, entities) in sources {
        for e in *entities {
            match by_type.get_mut(&e.entity_type) {
                Some(merged) => {
                    if strategy == MergeStrategy::FirstWins {
                        if !merged.sources.iter().any(|s| s == source_name) {
                            merged.sources.push(source_name.to_string());
                        }
                        merged.positions.extend(e.positions.iter().copied());
                        continue;
                    }
                    merged.count = match strategy {
                        MergeStrategy::ConservativeUnion => merged.count.max(e.count),
                        MergeStrategy::SumCounts => merged.count + e.count,
                        MergeStrategy::FirstWins => unreachable!(),
                    };
                    merged.confidence = merged.confidence.max(e.confidence);
                    if !merged.sources.iter().any(|s| s == source_name) {
                        merged.sources.push(source_name.to_string());
                    }
                    merged.positions.extend(e.positions.iter().copied());
                }
                None => {
                    by_type.insert(
                        e.entity_type.clone(),
                        MergedEntity {
                            entity_type: e.entity_type.clone(),
                            count: e.count,
                            confidence: e.confidence,
                            sources: vec![source_name.to_string()],
                            positions: e.positions.clone(),
                        },
                    );
                }
            }
        }
    }

    for merged in by_type.values_mut() {
        merged.positions = deduplicate_positions(std::mem::take(&mut merged.positions));
    }

    let mut entities: Vec<MergedEntity> = by_type.into_values().collect();
    entities.sort_by(|a, b| a.entity_type.cmp(&b.entity_type));
    entities
}

/// Low-level merge: entities + contexts from independent inputs, with an
/// explicit strategy.
pub fn merge_inputs(inputs: &[NormalizedInput], strategy: MergeStrategy) -> MergeResult {
    let sources: Vec<(&str, &[Entity])> = inputs.iter().map(|i| ("source", i.entities.as_slice())).collect();
    let entities = merge_entities(&sources, strategy);
    let contexts: Vec<&NormalizedContext> = inputs.iter().map(|i| &i.context).collect();
    let context = merge_contexts(&contexts);
    MergeResult { entities, context }
}

/// Full merge with named sources, for callers that want provenance per
/// input rather than the generic "source" label `merge_inputs` uses.
pub fn merge_inputs_full(named_inputs: &[(&str, &NormalizedInput)], strategy: MergeStrategy) -> MergeResult {
    let sources: Vec<(&str, &[Entity])> =
        named_inputs.iter().map(|(name, input)| (*name, input.entities.as_slice())).collect();
    let entities = merge_entities(&sources, strategy);
    let contexts: Vec<&NormalizedContext> = named_inputs.iter().map(|(_, input)| &input.context).collect();
    let context = merge_contexts(&contexts);
    MergeResult { entities, context }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(ty: &str, count: u32, conf: f64) -> Entity {
        Entity::new(ty, count, conf, "test")
    }

    #[test]
    fn sum_counts_sums_and_keeps_max_confidence() {
        let a = vec![entity("SSN", 2, 0.8)];
        let b = vec![entity("SSN", 3, 0.95)];
        let merged = merge_entities(&[("a", &a), ("b", &b)], MergeStrategy::SumCounts);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].count, 5);
        assert!((merged[0].confidence - 0.95).abs() < 1e-9);
        assert_eq!(merged[0].sources.len(), 2);
    }

    #[test]
    fn conservative_union_takes_max_count_not_sum() {
        let a = vec![entity("SSN", 1, 0.8)];
        let b = vec![entity("SSN", 3, 0.95)];
        let merged = merge_entities(&[("a", &a), ("b", &b)], MergeStrategy::ConservativeUnion);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].count, 3);
    }

    #[test]
    fn first_wins_keeps_first_sources_values_for_shared_types() {
        let a = vec![entity("SSN", 1, 0.8)];
        let b = vec![entity("SSN", 99, 0.99), entity("EMAIL", 1, 0.9)];
        let merged = merge_entities(&[("a", &a), ("b", &b)], MergeStrategy::FirstWins);
        let ssn = merged.iter().find(|e| e.entity_type == "SSN").unwrap();
        assert_eq!(ssn.count, 1);
        assert!((ssn.confidence - 0.8).abs() < 1e-9);
        assert!(merged.iter().any(|e| e.entity_type == "EMAIL"));
    }

    #[test]
    fn empty_merge_uses_sentinel_confidence_not_zero_certainty() {
        let result = merge_inputs(&[], MergeStrategy::ConservativeUnion);
        assert!(result.entities.is_empty());
        assert_eq!(CONFIDENCE_WHEN_NO_SPANS, 0.0);
    }

    #[test]
    fn highest_exposure_wins_across_contexts() {
        let a = NormalizedContext::new(ExposureLevel::Private);
        let b = NormalizedContext::new(ExposureLevel::Public);
        assert_eq!(get_highest_exposure(&[&a, &b]), ExposureLevel::Public);
    }

    #[test]
    fn deduplicate_positions_merges_overlapping_intervals() {
        let positions = vec![(10, 15), (0, 5), (3, 8)];
        assert_eq!(deduplicate_positions(positions), vec![(0, 8), (10, 15)]);
    }

    #[test]
    fn counts_roundtrip_through_entities() {
        let entities = vec![entity("SSN", 2, 0.9), entity("EMAIL", 1, 0.8)];
        let counts = entities_to_counts(&entities);
        assert_eq!(counts.get("SSN"), Some(&2));
        let back = counts_to_entities(&counts, 0.9, "test");
        assert_eq!(back.len(), 2);
    }
}
