//! Generic regex-based span matching: compiles a table of
//! `(pattern, entity_type, confidence, capture_group)` once into a
//! `RegexSet` + individual `Regex`es, pre-filtered by an Aho-Corasick
//! automaton over literals common to the table (`@`, `-`, `.`, `/`, `:`).
//! `regex`'s guaranteed linear-time matching means this table can grow
//! without opening a ReDoS hole the way backtracking engines would.

use crate::model::{Span, Tier};
use aho_corasick::AhoCorasick;
use regex::{Regex, RegexSet, RegexSetBuilder};

pub struct PatternRule {
    pub pattern: &'static str,
    pub entity_type: &'static str,
    pub confidence: f64,
    pub group: usize,
}

struct CompiledRule {
    regex: Regex,
    entity_type: &'static str,
    confidence: f64,
    group: usize,
}

/// A compiled table of pattern rules ready to scan text. Build once (the
/// individual detectors build theirs as `once_cell::sync::Lazy` statics)
/// and reuse across every call.
pub struct PatternSet {
    regex_set: RegexSet,
    rules: Vec<CompiledRule>,
    prefilter: Option<AhoCorasick>,
}

impl PatternSet {
    pub fn compile(rules: &[PatternRule]) -> Self {
        let patterns: Vec<&str> = rules.iter().map(|r| r.pattern).collect();
        let regex_set = RegexSetBuilder::new(&patterns)
            .size_limit(50 * 1024 * 1024)
            .build()
            .expect("pattern table failed to compile into a RegexSet");

        let compiled: Vec<CompiledRule> = rules
            .iter()
            .map(|r| CompiledRule {
                regex: Regex::new(r.pattern).expect("pattern failed to compile"),
                entity_type: r.entity_type,
                confidence: r.confidence,
                group: r.group,
            })
            .collect();

        let prefilter = AhoCorasick::builder().build(["@", "-", ".", "/", ":", " "]).ok();

        PatternSet { regex_set, rules: compiled, prefilter }
    }

    /// Fast reject: if none of the common literals the table's patterns
    /// rely on appear at all, skip the full regex pass entirely.
    pub fn might_match(&self, text: &str) -> bool {
        match &self.prefilter {
            Some(ac) => ac.is_match(text),
            None => true,
        }
    }

    pub fn detect(&self, text: &str, detector_name: &'static str) -> Vec<Span> {
        if !self.might_match(text) {
            return vec![];
        }

        let mut spans = Vec::new();
        for set_idx in self.regex_set.matches(text).into_iter() {
            let rule = &self.rules[set_idx];
            if rule.group > 0 {
                for caps in rule.regex.captures_iter(text) {
                    if let Some(m) = caps.get(rule.group) {
                        push_if_nonblank(&mut spans, m.start(), m.end(), m.as_str(), rule, detector_name);
                    }
                }
            } else {
                for m in rule.regex.find_iter(text) {
                    push_if_nonblank(&mut spans, m.start(), m.end(), m.as_str(), rule, detector_name);
                }
            }
        }
        spans
    }
}

fn push_if_nonblank(spans: &mut Vec<Span>, start: usize, end: usize, matched: &str, rule: &CompiledRule, detector_name: &'static str) {
    if matched.trim().is_empty() {
        return;
    }
    spans.push(Span::new(start, end, matched, rule.entity_type, rule.confidence, detector_name, Tier::Pattern));
}

/// Entity types that are "normally labeled" — a field a real document would
/// usually introduce with "Name:" or "DOB:" rather than leave bare. These
/// get [`crate::constants::UNLABELED_PENALTY`] applied when no nearby label
/// is found, on top of the base [`crate::constants::LABELED_BOOST`] applied
/// when one is. Types like EMAIL and PHONE are identifying on pattern alone
/// and don't carry the penalty side of the adjustment.
const NORMALLY_LABELED: &[&str] = &["NAME", "DATE_DOB", "ADDRESS", "MRN"];

const LABEL_WORDS: &[&str] = &[
    "name", "patient", "dob", "birth", "address", "lives at", "resides", "mrn", "record number", "chart number",
];

static BARE_RULES: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(&[
        PatternRule { pattern: r"[\w.+-]+@[\w-]+\.[\w.-]+", entity_type: "EMAIL", confidence: 0.90, group: 0 },
        PatternRule {
            pattern: r"\(?\b\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b",
            entity_type: "PHONE",
            confidence: 0.80,
            group: 0,
        },
        PatternRule {
            pattern: r"\b(?:0?[1-9]|1[0-2])[/-](?:0?[1-9]|[12]\d|3[01])[/-](?:19|20)\d{2}\b",
            entity_type: "DATE_DOB",
            confidence: 0.55,
            group: 0,
        },
        PatternRule {
            pattern: r"\b(?:19|20)\d{2}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])\b",
            entity_type: "DATE_DOB",
            confidence: 0.55,
            group: 0,
        },
        PatternRule {
            pattern: r"\b\d{1,5}\s+[A-Z][A-Za-z'.]+(?:\s+[A-Z][A-Za-z'.]+){0,3}\s+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Way|Place|Pl)\b\.?",
            entity_type: "ADDRESS",
            confidence: 0.55,
            group: 0,
        },
        PatternRule {
            pattern: r"(?i)\bMRN[-: ]?\s*(\d{6,10})\b",
            entity_type: "MRN",
            confidence: 0.60,
            group: 1,
        },
        // Two or three capitalized words in a row, outside any structured
        // line: the weakest signal here by far, so it starts near the floor
        // and only survives the confidence cutoff once a label boosts it.
        PatternRule {
            pattern: r"\b[A-Z][a-z]+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\b",
            entity_type: "NAME",
            confidence: 0.47,
            group: 0,
        },
    ])
});

const CONTEXT_RADIUS: usize = 30;

/// Bare/inline matches for person names, dates, addresses, phones, emails,
/// and medical record numbers — the free-text counterpart to
/// [`super::structured::StructuredExtractor`], which only fires on strict
/// `Label: value` lines. Every candidate here gets
/// [`crate::constants::LABELED_BOOST`] when it sits near a recognizable
/// field label and, for types that are normally labeled in real documents,
/// [`crate::constants::UNLABELED_PENALTY`] when it doesn't.
#[derive(Clone, Copy)]
pub struct PatternDetector;

impl crate::detectors::Detector for PatternDetector {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn detect(&self, text: &str) -> crate::error::Result<Vec<Span>> {
        let mut spans = Vec::with_capacity(8);
        for candidate in BARE_RULES.detect(text, "pattern") {
            let labeled = crate::detectors::has_nearby_label(text, candidate.start, candidate.end, LABEL_WORDS, CONTEXT_RADIUS);
            let mut confidence = candidate.confidence;
            if labeled {
                confidence += crate::constants::LABELED_BOOST;
            } else if NORMALLY_LABELED.contains(&candidate.entity_type.as_str()) {
                confidence -= crate::constants::UNLABELED_PENALTY;
            }
            spans.push(Span { confidence: crate::constants::clamp_confidence(confidence), ..candidate });
        }
        Ok(spans)
    }
}
