//! Detector trait and the individual detector implementations. Each
//! detector scans raw text and emits `Span`s; the orchestrator is
//! responsible for fanning out across detectors, enforcing per-detector
//! timeouts, and merging/deduping the results.

pub mod checksum_detector;
pub mod dictionary;
pub mod financial;
pub mod government;
pub mod known_entity;
pub mod pattern;
pub mod regulated;
pub mod secrets;
pub mod structured;

use crate::error::Result;
use crate::model::Span;

/// Every detector is pure: given text, it returns spans or an error. No
/// detector holds mutable state between calls — compiled patterns are
/// immutable statics, built once and shared across threads.
pub trait Detector: Send + Sync {
    /// Stable machine name, used in `DetectionMetadata` and log lines.
    fn name(&self) -> &'static str;

    fn detect(&self, text: &str) -> Result<Vec<Span>>;

    /// Whether this detector can run at all in the current environment.
    /// Pattern/dictionary/checksum detectors are always available; an
    /// ML-backed detector might report `false` when its model weights
    /// aren't present on disk.
    fn is_available(&self) -> bool {
        true
    }
}

/// Checks whether a match sits within `radius` characters of any of the
/// given label strings (case-insensitive), used by detectors that boost
/// or require a nearby label.
pub fn has_nearby_label(text: &str, start: usize, end: usize, labels: &[&str], radius: usize) -> bool {
    let window_start = start.saturating_sub(radius);
    let window_end = (end + radius).min(text.len());
    let window = match text.get(window_start..start).zip(text.get(end..window_end)) {
        Some((before, after)) => format!("{before} {after}"),
        None => return false,
    };
    let lower = window.to_lowercase();
    labels.iter().any(|l| lower.contains(&l.to_lowercase()))
}

/// Rough heuristic for "this looks like a placeholder/test value, not a
/// real secret": common test prefixes, runs of the same character,
/// sequential digits, or the literal word "example"/"sample"/"test".
pub fn looks_like_test_value(text: &str) -> bool {
    let lower = text.to_lowercase();
    let placeholder_markers = ["example", "sample", "test", "xxxx", "0000", "placeholder", "dummy", "fake"];
    if placeholder_markers.iter().any(|m| lower.contains(m)) {
        return true;
    }
    let mut chars = text.chars().filter(|c| c.is_alphanumeric());
    if let Some(first) = chars.clone().next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }
    false
}
