//! Span overlap detection and the orchestrator's two-pass dedup.
//!
//! The overlap check is an O(n log n) sort-and-sweep (no nested-loop
//! quadratic scan) used by both the dedup pass and the merger's interval
//! merge. Dedup itself is keyed exactly as the orchestrator pipeline
//! specifies: first collapse same-range-same-type duplicates, then resolve
//! same-range-different-type conflicts, in both cases preferring higher
//! tier and breaking ties on higher confidence.

use crate::model::{Span, Tier};
use std::collections::HashMap;

/// Find overlapping index pairs among `(start, end)` ranges using a single
/// sorted sweep. `allow_identical` treats exact-duplicate ranges as
/// non-overlapping (the caller handles those separately).
pub fn check_overlaps(spans: &[(usize, usize)], allow_identical: bool) -> Vec<(usize, usize)> {
    if spans.len() < 2 {
        return vec![];
    }

    let mut indices: Vec<usize> = (0..spans.len()).collect();
    indices.sort_by(|&a, &b| spans[a].0.cmp(&spans[b].0).then(spans[a].1.cmp(&spans[b].1)));

    let mut overlaps = Vec::new();
    for i in 0..indices.len() {
        let idx_i = indices[i];
        let (start_i, end_i) = spans[idx_i];

        for &idx_j in indices.iter().skip(i + 1) {
            let (start_j, end_j) = spans[idx_j];
            if start_j >= end_i {
                break;
            }
            if allow_identical && start_i == start_j && end_i == end_j {
                continue;
            }
            overlaps.push(if idx_i < idx_j { (idx_i, idx_j) } else { (idx_j, idx_i) });
        }
    }
    overlaps
}

fn better(a: (Tier, f64), b: (Tier, f64)) -> bool {
    // true if `a` should be preferred over `b`: higher tier wins, then
    // higher confidence.
    (a.0, ordered_float(a.1)) > (b.0, ordered_float(b.1))
}

fn ordered_float(f: f64) -> i64 {
    (f * 1_000_000.0).round() as i64
}

/// Pass 1: collapse spans that share `(start, end, entity_type)`, keeping
/// the one with the higher `(tier, confidence)`.
fn dedup_by_range_and_type(spans: Vec<Span>) -> Vec<Span> {
    let mut best: HashMap<(usize, usize, String), Span> = HashMap::new();
    for span in spans {
        let key = (span.start, span.end, span.entity_type.clone());
        match best.get(&key) {
            Some(existing) if !better((span.tier, span.confidence), (existing.tier, existing.confidence)) => {}
            _ => {
                best.insert(key, span);
            }
        }
    }
    best.into_values().collect()
}

/// Pass 2: among spans that still share the same `(start, end)` but
/// disagree on `entity_type`, keep only the highest `(tier, confidence)`.
fn dedup_by_range(spans: Vec<Span>) -> Vec<Span> {
    let mut best: HashMap<(usize, usize), Span> = HashMap::new();
    for span in spans {
        let key = (span.start, span.end);
        match best.get(&key) {
            Some(existing) if !better((span.tier, span.confidence), (existing.tier, existing.confidence)) => {}
            _ => {
                best.insert(key, span);
            }
        }
    }
    let mut result: Vec<Span> = best.into_values().collect();
    result.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    result
}

/// The orchestrator's authoritative two-pass dedup (§4.3 step 8): collapse
/// identical-range-and-type duplicates first, then resolve any remaining
/// same-range type conflicts. Idempotent: `dedup(dedup(spans)) == dedup(spans)`.
pub fn dedup_spans(spans: Vec<Span>) -> Vec<Span> {
    let pass1 = dedup_by_range_and_type(spans);
    dedup_by_range(pass1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, ty: &str, conf: f64, tier: Tier) -> Span {
        Span::new(start, end, "x".repeat(end - start), ty, conf, "test", tier)
    }

    #[test]
    fn test_no_overlaps() {
        let spans = vec![(0, 5), (5, 10), (10, 15)];
        assert!(check_overlaps(&spans, true).is_empty());
    }

    #[test]
    fn test_simple_overlap() {
        let spans = vec![(0, 10), (5, 15)];
        let result = check_overlaps(&spans, true);
        assert_eq!(result, vec![(0, 1)]);
    }

    #[test]
    fn test_identical_allowed_vs_not() {
        let spans = vec![(0, 10), (0, 10)];
        assert!(check_overlaps(&spans, true).is_empty());
        assert_eq!(check_overlaps(&spans, false).len(), 1);
    }

    #[test]
    fn dedup_collapses_identical_range_and_type() {
        let spans = vec![
            span(0, 10, "SSN", 0.80, Tier::Pattern),
            span(0, 10, "SSN", 0.99, Tier::Pattern),
        ];
        let result = dedup_spans(spans);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].confidence, 0.99);
    }

    #[test]
    fn dedup_resolves_same_range_type_conflict_by_tier() {
        let spans = vec![
            span(0, 10, "DIAGNOSIS", 0.99, Tier::Dictionary),
            span(0, 10, "SSN", 0.80, Tier::Structured),
        ];
        let result = dedup_spans(spans);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].entity_type, "SSN");
    }

    #[test]
    fn dedup_keeps_non_overlapping_spans() {
        let spans = vec![
            span(0, 5, "SSN", 0.99, Tier::Pattern),
            span(5, 10, "EMAIL", 0.95, Tier::Pattern),
        ];
        let result = dedup_spans(spans);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn dedup_is_idempotent() {
        let spans = vec![
            span(0, 10, "SSN", 0.80, Tier::Pattern),
            span(0, 10, "SSN", 0.99, Tier::Pattern),
            span(3, 7, "EMAIL", 0.90, Tier::Pattern),
        ];
        let once = dedup_spans(spans.clone());
        let twice = dedup_spans(once.clone());
        assert_eq!(once.len(), twice.len());
    }
}
