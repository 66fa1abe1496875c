//! The detection pipeline: runs every detector over a text, reconciles
//! their output into a single deduplicated span list, and reports what ran,
//! what failed, and what timed out.
//!
//! Pipeline, in order:
//!  0. input-size validation against `config.max_text_size`, and a
//!     detection-slot claim (`Context::acquire_detection_slot`) that fails
//!     fast with `QueueFull` once `config.max_workers` scans are already
//!     in flight
//!  1. known-entity lookup against the original text (cheap, always runs
//!     first so later steps can use it as additional context; allowlist
//!     values are exact strings and must not be read through OCR
//!     correction)
//!  2. structured/labeled-field extraction against the original text
//!     (highest-tier signal; its spans need no remap). This step also
//!     produces the OCR-corrected proxy text (`config.enable_ocr`) the
//!     remaining detectors scan instead of the original
//!  3. parallel fan-out across the remaining detectors against the proxy
//!     text, each bounded by `config.model_timeout_seconds`; a detector
//!     named in `config.disabled_detectors` is skipped entirely rather
//!     than run and discarded
//!  4. coordinate remap: every span found in step 3 is translated back to
//!     the original text's positions and text; a span that no longer lands
//!     on a valid boundary is dropped
//!  5. clinical-context filter (drop entity types that aren't identifying
//!     on their own, configured via `config.clinical_context_types`), then
//!     the `entity_types`/`exclude_types` allow/deny list
//!  6. tracking-number false-positive filtering (a bare 10-22 digit
//!     TRACKING_NUMBER_CARRIER span overlapping a higher-tier span is
//!     almost always the same digits re-read by a looser rule)
//!  7. confidence-floor filtering against `config.min_confidence`
//!  8. two-pass dedup (`spans::dedup_spans`)
//!  9. context-enhancer filter: drop dictionary hits inside an explicit
//!     negation ("no history of", "denies", "family history of", ...),
//!     run after dedup so a negated mention can't win a tie
//!  10. sort by position for deterministic output
//!
//! A detector failure or timeout is recovered locally (folded into
//! `DetectionMetadata`) unless `config.strict_mode` is set, in which case
//! it aborts the whole scan with an `Err` instead.

use crate::config::OnModelTimeout;
use crate::context::Context;
use crate::detectors::{
    checksum_detector::ChecksumDetector, dictionary::DictionaryDetector, financial::FinancialDetector,
    government::GovernmentDetector, known_entity::KnownEntityDetector, pattern::PatternDetector,
    regulated::RegulatedSectorDetector, secrets::SecretsDetector, structured::StructuredExtractor, Detector,
};
use crate::error::{OpenLabelsError, Result};
use crate::model::{DetectionMetadata, Span};
use crate::ocr;
use crate::spans;
use std::time::Duration;

const NEGATION_PHRASES: &[&str] = &["no history of", "denies", "family history of", "ruled out", "negative for"];
const NEGATION_WINDOW: usize = 40;

fn is_negated(text: &str, span: &Span) -> bool {
    let window_start = span.start.saturating_sub(NEGATION_WINDOW);
    let Some(before) = text.get(window_start..span.start) else { return false };
    let lower = before.to_lowercase();
    NEGATION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Drops a `TRACKING_NUMBER_CARRIER` span when it overlaps another span of
/// a different, more specific type — the looser tracking-number pattern is
/// almost always a re-read of digits another detector already classified
/// more precisely.
fn filter_tracking_number_false_positives(spans: Vec<Span>) -> Vec<Span> {
    let (tracking, mut rest): (Vec<Span>, Vec<Span>) = spans.into_iter().partition(|s| s.entity_type == "TRACKING_NUMBER_CARRIER");
    for t in tracking {
        let overlaps_other = rest.iter().any(|s| s.start < t.end && t.start < s.end);
        if !overlaps_other {
            rest.push(t);
        }
    }
    rest
}

/// `entity_types` (allowlist) and `exclude_types` (denylist) as configured;
/// an allowlist, when set, wins over an overlapping denylist entry since a
/// caller who explicitly asked for a type presumably meant it.
fn passes_type_filter(config: &crate::config::Config, entity_type: &str) -> bool {
    if let Some(allowed) = &config.entity_types {
        if !allowed.contains(entity_type) {
            return false;
        }
    }
    if let Some(excluded) = &config.exclude_types {
        if excluded.contains(entity_type) {
            return false;
        }
    }
    true
}

/// Outcome of a single fanned-out detector call.
enum DetectorOutcome {
    Ran(Vec<Span>),
    Failed(String),
    TimedOut,
}

/// Runs the full detector pipeline over `text`, given a known-entity
/// allowlist (may be empty). Returns the deduplicated spans plus a report
/// of which detectors ran, failed, or timed out.
pub fn detect(context: &Context, text: &str, known_entities: &KnownEntityDetector) -> Result<(Vec<Span>, DetectionMetadata)> {
    // Step 0: reject oversize input before claiming a worker slot or
    // running anything over it.
    if text.len() > context.config.max_text_size {
        return Err(OpenLabelsError::InvalidInput {
            message: format!("input is {} bytes, exceeds max_text_size of {} bytes", text.len(), context.config.max_text_size),
        });
    }
    let _slot = context.acquire_detection_slot()?;

    let mut metadata = DetectionMetadata::default();
    let mut all_spans: Vec<Span> = Vec::new();
    let disabled = &context.config.disabled_detectors;

    // Step 1: known-entity lookup.
    if known_entities.is_available() && !disabled.contains("known_entity") {
        run_detector(context, known_entities, text, &mut all_spans, &mut metadata)?;
    }

    // Step 2: structured/labeled-field extraction runs on the original text
    // directly — its spans are already in original coordinates, so they go
    // straight into `all_spans` with no remap needed. This step also
    // produces the OCR-corrected proxy text (when `config.enable_ocr`) that
    // step 3's detectors scan instead of the original.
    let structured = StructuredExtractor;
    if !disabled.contains("structured") {
        run_detector(context, &structured, text, &mut all_spans, &mut metadata)?;
    }
    let (scan_text, char_map) =
        if context.config.enable_ocr { ocr::correct(text) } else { (text.to_string(), Vec::new()) };
    let mut processed_spans: Vec<Span> = Vec::new();

    // Step 3: the remaining detectors, fanned out with a per-call timeout
    // (or run sequentially if the context was built with max_workers <= 1).
    // A detector named in `disabled_detectors` is skipped entirely.
    let timeout = Duration::from_secs(context.config.model_timeout_seconds);
    let checksum = ChecksumDetector;
    let government = GovernmentDetector;
    let secrets = SecretsDetector;
    let financial = FinancialDetector;
    let regulated = RegulatedSectorDetector;
    let dictionary = DictionaryDetector;
    let pattern = PatternDetector;

    let mut fanned_out: Vec<(&str, DetectorOutcome)> = Vec::with_capacity(7);
    macro_rules! fan_out {
        ($det:expr) => {
            if !disabled.contains($det.name()) {
                fanned_out.push(if context.is_sequential() {
                    run_sync(&$det, &scan_text)
                } else {
                    run_bounded(context, &$det, &scan_text, timeout)
                });
            }
        };
    }
    fan_out!(checksum);
    fan_out!(government);
    fan_out!(secrets);
    fan_out!(financial);
    fan_out!(regulated);
    fan_out!(dictionary);
    fan_out!(pattern);

    for (name, outcome) in fanned_out {
        match outcome {
            DetectorOutcome::Ran(spans) => {
                metadata.detectors_run.push(name.to_string());
                processed_spans.extend(spans);
            }
            DetectorOutcome::Failed(message) => {
                if context.config.strict_mode {
                    return Err(OpenLabelsError::DetectorFailure { detector: name.to_string(), message });
                }
                metadata.detectors_failed.push(name.to_string());
                metadata.add_warning(format!("{name} failed: {message}"));
            }
            DetectorOutcome::TimedOut => match context.config.on_model_timeout {
                OnModelTimeout::Error => {
                    return Err(OpenLabelsError::DetectorTimeout {
                        detector: name.to_string(),
                        budget_ms: timeout.as_millis() as u64,
                    });
                }
                OnModelTimeout::Degraded => {
                    metadata.detectors_timed_out.push(name.to_string());
                    metadata.add_warning(format!("{name} exceeded its {}s budget", context.config.model_timeout_seconds));
                }
            },
        }
    }

    // Step 4: coordinate remap — translate each span found in the proxy text back to
    // `text`'s coordinates, reporting what the source actually contains
    // rather than the corrected reading. A span that no longer lands on a
    // valid char boundary (the map doesn't cover it) is dropped rather than
    // risk reporting a position that doesn't match `text`.
    for span in processed_spans {
        match ocr::remap_span(text, &char_map, span.start, span.end) {
            Some((start, end, original_text)) => {
                all_spans.push(Span { start, end, text: original_text.to_string(), ..span });
            }
            None => {
                metadata.add_warning(format!(
                    "{} span at {}..{} dropped: could not remap through OCR correction",
                    span.detector_name, span.start, span.end
                ));
            }
        }
    }

    if !metadata.detectors_run.is_empty() && metadata.detectors_run.len() == metadata.detectors_failed.len() {
        metadata.all_detectors_failed = true;
    }
    metadata.degraded = !metadata.detectors_timed_out.is_empty() || !metadata.detectors_failed.is_empty();
    metadata.runaway_threads = context.runaway_threads();

    // Step 5: clinical-context filter — entity types that aren't
    // identifying on their own (configured, defaults to just LAB_TEST) —
    // followed by the configured entity-type allow/deny list.
    all_spans.retain(|s| !context.config.clinical_context_types.contains(&s.entity_type));
    all_spans.retain(|s| passes_type_filter(&context.config, &s.entity_type));

    // Step 6: tracking-number false-positive filter.
    all_spans = filter_tracking_number_false_positives(all_spans);

    // Step 7: confidence floor.
    let min_confidence = context.config.min_confidence;
    all_spans.retain(|s| s.confidence >= min_confidence);

    // Step 8: two-pass dedup.
    let mut deduped = spans::dedup_spans(all_spans);

    // Step 9: context-enhancer filter — drop dictionary hits sitting inside
    // an explicit negation ("no history of", "denies", ...). Run last so a
    // negated mention never wins a dedup tie against a genuine one it
    // happens to share a range with.
    deduped.retain(|s| !(s.tier == crate::model::Tier::Dictionary && is_negated(text, s)));

    // Step 10: deterministic ordering.
    deduped.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    Ok((deduped, metadata))
}

/// Reads `path` and runs `detect` over its contents, rejecting anything
/// over `config.max_file_size` before the file is even opened.
pub fn detect_file(
    context: &Context,
    path: &std::path::Path,
    known_entities: &KnownEntityDetector,
) -> Result<(Vec<Span>, DetectionMetadata)> {
    let size = std::fs::metadata(path)
        .map_err(|e| OpenLabelsError::InvalidInput { message: format!("cannot stat {}: {e}", path.display()) })?
        .len();
    if size > context.config.max_file_size as u64 {
        return Err(OpenLabelsError::InvalidInput {
            message: format!("{} is {size} bytes, exceeds max_file_size of {} bytes", path.display(), context.config.max_file_size),
        });
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| OpenLabelsError::InvalidInput { message: format!("cannot read {}: {e}", path.display()) })?;
    detect(context, &text, known_entities)
}

fn run_detector(
    context: &Context,
    detector: &dyn Detector,
    text: &str,
    out: &mut Vec<Span>,
    metadata: &mut DetectionMetadata,
) -> Result<()> {
    match detector.detect(text) {
        Ok(spans) => {
            metadata.detectors_run.push(detector.name().to_string());
            out.extend(spans);
            Ok(())
        }
        Err(e) => {
            if context.config.strict_mode {
                return Err(OpenLabelsError::DetectorFailure { detector: detector.name().to_string(), message: e.to_string() });
            }
            metadata.detectors_failed.push(detector.name().to_string());
            metadata.add_warning(format!("{} failed: {e}", detector.name()));
            Ok(())
        }
    }
}

fn run_sync<'a>(detector: &'a (dyn Detector), text: &str) -> (&'a str, DetectorOutcome) {
    let outcome = match detector.detect(text) {
        Ok(spans) => DetectorOutcome::Ran(spans),
        Err(e) => DetectorOutcome::Failed(e.to_string()),
    };
    (detector.name(), outcome)
}

fn run_bounded<'a, D>(context: &Context, detector: &'a D, text: &str, timeout: Duration) -> (&'a str, DetectorOutcome)
where
    D: Detector + Clone + 'static,
{
    let owned_text = text.to_string();
    let detector_clone = detector.clone();
    let outcome = match context.run_with_timeout(timeout, move || detector_clone.detect(&owned_text)) {
        Some(Ok(spans)) => DetectorOutcome::Ran(spans),
        Some(Err(e)) => DetectorOutcome::Failed(e.to_string()),
        None => DetectorOutcome::TimedOut,
    };
    (detector.name(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::Registry;

    #[test]
    fn pipeline_detects_ssn_and_classification() {
        let context = Context::new(Config::default(), Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, metadata) = detect(&context, "SSN: 123-45-6789, marked TOP SECRET", &known).unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "SSN"));
        assert!(spans.iter().any(|s| s.entity_type == "CLASSIFICATION_LEVEL"));
        assert!(!metadata.detectors_run.is_empty());
    }

    #[test]
    fn negated_diagnosis_is_filtered_out() {
        let context = Context::new(Config::default(), Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, _) = detect(&context, "Patient denies diabetes mellitus", &known).unwrap();
        assert!(spans.iter().all(|s| s.entity_type != "DIAGNOSIS"));
    }

    #[test]
    fn clinical_context_type_is_dropped_by_default() {
        let context = Context::new(Config::default(), Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, _) = detect(&context, "Lab Test: glucose panel", &known).unwrap();
        assert!(spans.iter().all(|s| s.entity_type != "LAB_TEST"));
    }

    #[test]
    fn diagnosis_survives_clinical_context_filter_by_default() {
        let context = Context::new(Config::default(), Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, _) = detect(&context, "Patient has hypertension", &known).unwrap();
        assert!(spans.iter().any(|s| s.entity_type == "DIAGNOSIS"));
    }

    #[test]
    fn dedup_collapses_overlapping_detections() {
        let context = Context::new(Config::default(), Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, _) = detect(&context, "SSN: 123-45-6789", &known).unwrap();
        let ssn_spans: Vec<&Span> = spans.iter().filter(|s| s.entity_type == "SSN").collect();
        assert_eq!(ssn_spans.len(), 1);
    }

    #[test]
    fn ocr_misread_digit_is_corrected_but_span_reports_original_text() {
        let context = Context::new(Config::default(), Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let text = "on file, found 123-O5-6789 near the top";
        let (spans, _) = detect(&context, text, &known).unwrap();
        let ssn = spans.iter().find(|s| s.entity_type == "SSN").expect("OCR correction should surface the SSN");
        assert_eq!(ssn.text, "123-O5-6789");
        assert_eq!(&text[ssn.start..ssn.end], ssn.text);
    }

    #[test]
    fn ocr_correction_disabled_leaves_misread_digit_unmatched() {
        let mut config = Config::default();
        config.enable_ocr = false;
        let context = Context::new(config, Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, _) = detect(&context, "on file, found 123-O5-6789 near the top", &known).unwrap();
        assert!(spans.iter().all(|s| s.entity_type != "SSN"));
    }

    #[test]
    fn oversize_input_is_rejected() {
        let mut config = Config::default();
        config.max_text_size = 10;
        let context = Context::new(config, Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let result = detect(&context, "this text is definitely longer than ten bytes", &known);
        assert!(matches!(result, Err(OpenLabelsError::InvalidInput { .. })));
    }

    #[test]
    fn disabled_detector_is_skipped() {
        let mut config = Config::default();
        config.disabled_detectors.insert("checksum".to_string());
        let context = Context::new(config, Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, metadata) = detect(&context, "SSN: 123-45-6789", &known).unwrap();
        assert!(!metadata.detectors_run.iter().any(|d| d == "checksum"));
        assert!(spans.iter().all(|s| s.entity_type != "SSN"));
    }

    #[test]
    fn exclude_types_drops_matching_spans() {
        let mut config = Config::default();
        config.exclude_types = Some(["SSN".to_string()].into_iter().collect());
        let context = Context::new(config, Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, _) = detect(&context, "SSN: 123-45-6789", &known).unwrap();
        assert!(spans.iter().all(|s| s.entity_type != "SSN"));
    }

    #[test]
    fn entity_types_allowlist_keeps_only_named_types() {
        let mut config = Config::default();
        config.entity_types = Some(["SSN".to_string()].into_iter().collect());
        let context = Context::new(config, Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        let (spans, _) = detect(&context, "SSN: 123-45-6789, marked TOP SECRET", &known).unwrap();
        assert!(spans.iter().all(|s| s.entity_type == "SSN"));
        assert!(spans.iter().any(|s| s.entity_type == "SSN"));
    }

    #[test]
    fn strict_mode_propagates_detector_failure() {
        let mut config = Config::default();
        config.strict_mode = true;
        let context = Context::new(config, Registry::with_base_only());
        let known = KnownEntityDetector::empty();
        // No detector in this pipeline fails on ordinary text, so strict
        // mode should still succeed the same way degraded mode does.
        let result = detect(&context, "SSN: 123-45-6789", &known);
        assert!(result.is_ok());
    }
}
