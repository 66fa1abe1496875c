//! Scan-trigger engine: decides whether a previously-scanned object is due
//! for a rescan, and how urgently, from its normalized context and the
//! entities already known about it.

use crate::model::{Entity, ExposureLevel, NormalizedContext};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CONFIDENCE_THRESHOLD: f64 = 0.80;
pub const HIGH_RISK_WEIGHT_THRESHOLD: i32 = 8;
pub const STALENESS_THRESHOLD_DAYS: u32 = 365;

/// A single reason a rescan is warranted. Multiple triggers can fire for
/// the same object; all of them are reported, not just the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanTrigger {
    NoEncryption,
    LowConfidenceHighRisk,
    StaleData,
    NoLabels,
    PublicAccess,
    OrgWide,
}

impl ScanTrigger {
    pub fn description(&self) -> &'static str {
        match self {
            ScanTrigger::NoEncryption => "object has no encryption at rest",
            ScanTrigger::LowConfidenceHighRisk => {
                "a high-risk entity type was detected below the confidence threshold"
            }
            ScanTrigger::StaleData => "context has not been refreshed within the staleness window",
            ScanTrigger::NoLabels => "object carries no classification label",
            ScanTrigger::PublicAccess => "object is publicly accessible",
            ScanTrigger::OrgWide => "object is shared org-wide",
        }
    }
}

impl fmt::Display for ScanTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanTrigger::NoEncryption => "NO_ENCRYPTION",
            ScanTrigger::LowConfidenceHighRisk => "LOW_CONFIDENCE_HIGH_RISK",
            ScanTrigger::StaleData => "STALE_DATA",
            ScanTrigger::NoLabels => "NO_LABELS",
            ScanTrigger::PublicAccess => "PUBLIC_ACCESS",
            ScanTrigger::OrgWide => "ORG_WIDE",
        };
        write!(f, "{s}")
    }
}

/// Which triggers fire for this context + entity set, evaluated
/// independently — order carries no meaning.
pub fn active_triggers(context: &NormalizedContext, entities: &[Entity], registry: &Registry) -> Vec<ScanTrigger> {
    let mut triggers = Vec::new();

    if matches!(context.encryption, crate::model::Encryption::None) {
        triggers.push(ScanTrigger::NoEncryption);
    }

    let has_low_confidence_high_risk = entities.iter().any(|e| {
        e.confidence < CONFIDENCE_THRESHOLD
            && registry.get_weight(&e.entity_type) >= HIGH_RISK_WEIGHT_THRESHOLD
    });
    if has_low_confidence_high_risk {
        triggers.push(ScanTrigger::LowConfidenceHighRisk);
    }

    if context.staleness_days >= STALENESS_THRESHOLD_DAYS {
        triggers.push(ScanTrigger::StaleData);
    }

    if entities.is_empty() || !context.has_classification {
        triggers.push(ScanTrigger::NoLabels);
    }

    if context.exposure == ExposureLevel::Public {
        triggers.push(ScanTrigger::PublicAccess);
    }

    if context.exposure == ExposureLevel::OrgWide {
        triggers.push(ScanTrigger::OrgWide);
    }

    triggers
}

/// Whether the object should be rescanned at all — any trigger firing is
/// sufficient.
pub fn should_scan(context: &NormalizedContext, entities: &[Entity], registry: &Registry) -> bool {
    !active_triggers(context, entities, registry).is_empty()
}

fn exposure_base(exposure: ExposureLevel) -> i32 {
    match exposure {
        ExposureLevel::Private => 0,
        ExposureLevel::Internal => 10,
        ExposureLevel::OrgWide => 30,
        ExposureLevel::Public => 50,
    }
}

/// Boost added per active trigger. PUBLIC_ACCESS and ORG_WIDE carry no
/// additional boost of their own — their weight is already captured by
/// `exposure_base`, and double-counting it here would double-count exposure.
fn trigger_boost(trigger: ScanTrigger) -> i32 {
    match trigger {
        ScanTrigger::NoEncryption => 20,
        ScanTrigger::LowConfidenceHighRisk => 25,
        ScanTrigger::StaleData => 5,
        ScanTrigger::NoLabels => 15,
        ScanTrigger::PublicAccess | ScanTrigger::OrgWide => 0,
    }
}

/// Priority in `[0, 100]`: an exposure base plus a boost for every active
/// trigger, capped.
pub fn calculate_scan_priority(context: &NormalizedContext, entities: &[Entity], registry: &Registry) -> i32 {
    let mut priority = exposure_base(context.exposure);
    for trigger in active_triggers(context, entities, registry) {
        priority += trigger_boost(trigger);
    }
    priority.clamp(0, 100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanUrgency {
    Immediate,
    High,
    Medium,
    Low,
    None,
}

impl fmt::Display for ScanUrgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanUrgency::Immediate => "IMMEDIATE",
            ScanUrgency::High => "HIGH",
            ScanUrgency::Medium => "MEDIUM",
            ScanUrgency::Low => "LOW",
            ScanUrgency::None => "NONE",
        };
        write!(f, "{s}")
    }
}

/// Coarse bucketing of `calculate_scan_priority` for dashboards and queue
/// triage views that don't want the raw 0-100 number.
pub fn get_scan_urgency(context: &NormalizedContext, entities: &[Entity], registry: &Registry) -> ScanUrgency {
    if !should_scan(context, entities, registry) {
        return ScanUrgency::None;
    }
    match calculate_scan_priority(context, entities, registry) {
        p if p >= 75 => ScanUrgency::Immediate,
        p if p >= 50 => ScanUrgency::High,
        p if p >= 25 => ScanUrgency::Medium,
        _ => ScanUrgency::Low,
    }
}

/// Human-readable descriptions for every trigger currently active, for
/// audit logs and operator-facing summaries.
pub fn get_trigger_descriptions(context: &NormalizedContext, entities: &[Entity], registry: &Registry) -> Vec<String> {
    active_triggers(context, entities, registry)
        .into_iter()
        .map(|t| format!("{t}: {}", t.description()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Encryption;

    fn registry() -> Registry {
        Registry::with_base_only()
    }

    #[test]
    fn no_triggers_on_clean_context() {
        let mut ctx = NormalizedContext::new(ExposureLevel::Private);
        ctx.encryption = Encryption::CustomerManaged;
        ctx.has_classification = true;
        ctx.staleness_days = 1;
        let reg = registry();
        assert!(!should_scan(&ctx, &[], &reg));
        assert_eq!(get_scan_urgency(&ctx, &[], &reg), ScanUrgency::None);
    }

    #[test]
    fn public_with_no_encryption_and_no_labels_is_high_priority() {
        let ctx = NormalizedContext::new(ExposureLevel::Public);
        let reg = registry();
        let triggers = active_triggers(&ctx, &[], &reg);
        assert!(triggers.contains(&ScanTrigger::NoEncryption));
        assert!(triggers.contains(&ScanTrigger::NoLabels));
        assert!(triggers.contains(&ScanTrigger::PublicAccess));
        // staleness_days defaults to 0, below threshold: no STALE_DATA trigger
        assert!(!triggers.contains(&ScanTrigger::StaleData));
        let priority = calculate_scan_priority(&ctx, &[], &reg);
        assert_eq!(priority, 50 + 20 + 15);
    }

    #[test]
    fn priority_is_capped_at_100() {
        let mut ctx = NormalizedContext::new(ExposureLevel::Public);
        ctx.staleness_days = 400;
        let reg = registry();
        let entities = vec![Entity::new("SSN", 1, 0.5, "test")];
        let priority = calculate_scan_priority(&ctx, &entities, &reg);
        assert_eq!(priority, 100);
    }

    #[test]
    fn low_confidence_high_risk_entity_triggers_rescan() {
        let ctx = {
            let mut c = NormalizedContext::new(ExposureLevel::Private);
            c.encryption = Encryption::CustomerManaged;
            c.has_classification = true;
            c
        };
        let reg = registry();
        let entities = vec![Entity::new("SSN", 1, 0.5, "test")];
        assert!(should_scan(&ctx, &entities, &reg));
    }
}
