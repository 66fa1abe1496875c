//! Entity Registry: canonical entity types, their risk weights, category
//! tags, and vendor-specific aliases. The single source of truth every
//! detector and adapter normalizes through before anything downstream (the
//! scorer, the trigger engine) sees an entity type.
//!
//! The base tables are process-wide and read-only; an optional overlay file
//! can raise or lower individual weights for an organization without
//! touching the binary.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_WEIGHT: i32 = 5;

static ENTITY_WEIGHTS: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for k in &[
        "SSN", "PASSPORT", "CREDIT_CARD", "PASSWORD", "API_KEY", "PRIVATE_KEY",
        "AWS_ACCESS_KEY", "AWS_SECRET_KEY", "DATABASE_URL", "GITHUB_TOKEN",
        "GITLAB_TOKEN", "SLACK_TOKEN", "STRIPE_KEY", "CRYPTO_SEED_PHRASE",
    ] {
        m.insert(*k, 10);
    }
    m.insert("MRN", 9);
    m.insert("DIAGNOSIS", 9);
    m.insert("HEALTH_PLAN_ID", 9);
    m.insert("JWT", 9);
    m.insert("DRIVER_LICENSE", 8);
    m.insert("NPI", 8);
    m.insert("DEA", 8);
    m.insert("TAX_ID", 8);
    m.insert("MILITARY_ID", 8);
    m.insert("CLASSIFICATION_LEVEL", 8);
    m.insert("CLASSIFICATION_MARKING", 8);
    m.insert("SCI_MARKING", 9);
    m.insert("SCI_COMPARTMENT", 9);
    m.insert("DISSEMINATION_CONTROL", 8);
    m.insert("CLEARANCE_LEVEL", 8);
    m.insert("EXPORT_CONTROL_MARKING", 8);
    m.insert("DUNS_NUMBER", 4);
    for k in &["BITCOIN_ADDRESS", "ETHEREUM_ADDRESS", "IBAN", "SWIFT_BIC", "ABA_ROUTING"] {
        m.insert(*k, 7);
    }
    for k in &["PHONE", "EMAIL", "SENDGRID_KEY", "TWILIO_KEY"] {
        m.insert(*k, 6);
    }
    for k in &["NAME", "ADDRESS", "IP_ADDRESS", "MAC_ADDRESS", "VIN", "CUSIP", "ISIN",
               "SEDOL", "LEI", "DATE_DOB", "A_NUMBER", "VISA_NUMBER"] {
        m.insert(*k, 5);
    }
    for k in &["AGE", "DOD_CONTRACT", "GSA_CONTRACT", "CAGE_CODE", "UEI",
               "STUDENT_ID", "BAR_NUMBER", "CASE_NUMBER", "TRACKING_NUMBER_CARRIER"] {
        m.insert(*k, 4);
    }
    m.insert("DATE", 3);
    m.insert("ZIP", 3);
    for k in &["CITY", "STATE", "COUNTRY", "TRACKING_NUMBER"] {
        m.insert(*k, 2);
    }
    m.insert("LAB_TEST", 4);
    m.insert("PAYER", 3);
    m.insert("PROFESSION", 2);
    m.insert("FACILITY", 1);
    m.insert("ORGANIZATION", 1);
    m
});

static ENTITY_CATEGORIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for k in &["SSN", "PASSPORT", "DRIVER_LICENSE", "MILITARY_ID", "TAX_ID", "MRN", "STATE_ID"] {
        m.insert(*k, "direct_identifier");
    }
    for k in &["DIAGNOSIS", "MEDICATION", "HEALTH_PLAN_ID", "NPI", "DEA", "LAB_TEST", "PROCEDURE", "PAYER"] {
        m.insert(*k, "health_info");
    }
    for k in &["PROFESSION"] {
        m.insert(*k, "quasi_identifier");
    }
    for k in &["CREDIT_CARD", "IBAN", "SWIFT_BIC", "ACCOUNT_NUMBER", "CUSIP", "ISIN",
               "SEDOL", "ABA_ROUTING", "BITCOIN_ADDRESS", "ETHEREUM_ADDRESS", "CRYPTO_SEED_PHRASE"] {
        m.insert(*k, "financial");
    }
    for k in &["EMAIL", "PHONE", "ADDRESS", "ZIP", "FAX"] {
        m.insert(*k, "contact");
    }
    for k in &["PASSWORD", "API_KEY", "PRIVATE_KEY", "JWT", "AWS_ACCESS_KEY",
               "AWS_SECRET_KEY", "GITHUB_TOKEN", "GITLAB_TOKEN", "SLACK_TOKEN",
               "STRIPE_KEY", "DATABASE_URL"] {
        m.insert(*k, "credential");
    }
    for k in &["NAME", "DATE_DOB", "AGE", "DATE"] {
        m.insert(*k, "quasi_identifier");
    }
    for k in &["CLASSIFICATION_LEVEL", "CLASSIFICATION_MARKING", "SCI_MARKING", "SCI_COMPARTMENT",
               "DISSEMINATION_CONTROL", "CLEARANCE_LEVEL", "EXPORT_CONTROL_MARKING"] {
        m.insert(*k, "classification_marking");
    }
    m
});

static VENDOR_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("US_SSN", "SSN");
    m.insert("SOCIAL_SECURITY", "SSN");
    m.insert("SOCIALSECURITYNUMBER", "SSN");
    m.insert("PER", "NAME");
    m.insert("PERSON", "NAME");
    m.insert("DOB", "DATE_DOB");
    m.insert("BIRTHDAY", "DATE_DOB");
    m.insert("DATEOFBIRTH", "DATE_DOB");
    m.insert("DATE_OF_BIRTH", "DATE_DOB");
    m.insert("BIRTH_DATE", "DATE_DOB");
    m.insert("BIRTHDATE", "DATE_DOB");
    m.insert("CC", "CREDIT_CARD");
    m.insert("CREDITCARD", "CREDIT_CARD");
    m.insert("CREDITCARDNUMBER", "CREDIT_CARD");
    m.insert("CREDIT_CARD_NUMBER", "CREDIT_CARD");
    m.insert("TELEPHONE", "PHONE");
    m.insert("TEL", "PHONE");
    m.insert("MOBILE", "PHONE");
    m.insert("CELL", "PHONE");
    m.insert("PHONENUMBER", "PHONE");
    m.insert("PHONE_NUMBER", "PHONE");
    m.insert("US_PHONE_NUMBER", "PHONE");
    m.insert("EMAILADDRESS", "EMAIL");
    m.insert("EMAIL_ADDRESS", "EMAIL");
    m.insert("STREET_ADDRESS", "ADDRESS");
    m.insert("STREET", "ADDRESS");
    m.insert("IP", "IP_ADDRESS");
    m.insert("IPADDRESS", "IP_ADDRESS");
    m.insert("IPV4", "IP_ADDRESS");
    m.insert("IPV6", "IP_ADDRESS");
    m.insert("MEDICAL_RECORD", "MRN");
    m.insert("MEDICALRECORD", "MRN");
    m.insert("LICENSE", "DRIVER_LICENSE");
    m.insert("US_DRIVER_LICENSE", "DRIVER_LICENSE");
    m.insert("DRIVERSLICENSE", "DRIVER_LICENSE");
    m.insert("US_PASSPORT", "PASSPORT");
    m.insert("PASSPORT_NUMBER", "PASSPORT");
    m.insert("ZIPCODE", "ZIP");
    m.insert("ZIP_CODE", "ZIP");
    m.insert("POSTCODE", "ZIP");
    m.insert("LOCATION_ZIP", "ZIP");
    m.insert("ROUTING_NUMBER", "ABA_ROUTING");
    m
});

/// A loaded weight overlay, keyed by canonical type. Invalid entries (out of
/// 1-10 range) are dropped at load time rather than rejecting the whole file.
#[derive(Debug, Default, Clone)]
pub struct WeightOverlay(HashMap<String, i32>);

impl WeightOverlay {
    pub fn empty() -> Self {
        WeightOverlay(HashMap::new())
    }

    pub fn from_map(raw: HashMap<String, i32>) -> Self {
        let mut m = HashMap::new();
        for (k, v) in raw {
            if (1..=10).contains(&v) {
                m.insert(k.to_uppercase(), v);
            } else {
                tracing::warn!(entity_type = %k, weight = v, "ignoring out-of-range weight override");
            }
        }
        WeightOverlay(m)
    }

    /// Locates and loads the overlay from, in order: an explicit path, the
    /// `OPENLABELS_WEIGHTS_FILE` env var, `~/.openlabels/weights.yaml`, or
    /// `/etc/openlabels/weights.yaml`. A missing file anywhere in the chain
    /// is not an error — the registry just runs with base weights.
    pub fn load(explicit: Option<&Path>) -> Self {
        let candidate = explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var("OPENLABELS_WEIGHTS_FILE").ok().map(PathBuf::from))
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".openlabels").join("weights.yaml")))
            .unwrap_or_else(|| PathBuf::from("/etc/openlabels/weights.yaml"));

        match std::fs::read_to_string(&candidate) {
            Ok(contents) => match serde_yaml::from_str::<HashMap<String, i32>>(&contents) {
                Ok(raw) => WeightOverlay::from_map(raw),
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "failed to parse weights overlay, ignoring");
                    WeightOverlay::empty()
                }
            },
            Err(_) => WeightOverlay::empty(),
        }
    }
}

/// Canonical entity registry. Cheap to clone (wraps an `Arc`-free, small
/// overlay); the base tables it reads from are process-wide statics.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    overlay: WeightOverlay,
}

impl Registry {
    pub fn new(overlay: WeightOverlay) -> Self {
        Registry { overlay }
    }

    pub fn with_base_only() -> Self {
        Registry { overlay: WeightOverlay::empty() }
    }

    /// Normalizes a raw vendor type to its canonical form: already-canonical
    /// types pass through unchanged, aliases resolve to their canonical
    /// target, and anything else passes through as an unknown type.
    pub fn normalize_type(&self, raw: &str) -> String {
        let upper = raw.trim().to_uppercase();
        if ENTITY_WEIGHTS.contains_key(upper.as_str()) {
            return upper;
        }
        if let Some(canonical) = VENDOR_ALIASES.get(upper.as_str()) {
            return canonical.to_string();
        }
        upper
    }

    pub fn get_weight(&self, entity_type: &str) -> i32 {
        let canonical = self.normalize_type(entity_type);
        if let Some(w) = self.overlay.0.get(&canonical) {
            return *w;
        }
        *ENTITY_WEIGHTS.get(canonical.as_str()).unwrap_or(&DEFAULT_WEIGHT)
    }

    pub fn get_category(&self, entity_type: &str) -> String {
        let canonical = self.normalize_type(entity_type);
        ENTITY_CATEGORIES.get(canonical.as_str()).unwrap_or(&"unknown").to_string()
    }

    pub fn is_known_type(&self, entity_type: &str) -> bool {
        let upper = entity_type.trim().to_uppercase();
        ENTITY_WEIGHTS.contains_key(upper.as_str()) || VENDOR_ALIASES.contains_key(upper.as_str())
    }

    pub fn get_types_by_category(&self, category: &str) -> Vec<String> {
        ENTITY_CATEGORIES
            .iter()
            .filter(|(_, c)| **c == category)
            .map(|(t, _)| t.to_string())
            .collect()
    }

    pub fn get_high_risk_types(&self, min_weight: i32) -> Vec<String> {
        ENTITY_WEIGHTS
            .iter()
            .filter(|(_, w)| **w >= min_weight)
            .map(|(t, _)| t.to_string())
            .collect()
    }

    pub fn get_all_categories(&self) -> std::collections::HashSet<String> {
        ENTITY_CATEGORIES.values().map(|c| c.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let registry = Registry::with_base_only();
        let once = registry.normalize_type("us_ssn");
        let twice = registry.normalize_type(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "SSN");
    }

    #[test]
    fn unknown_type_gets_default_weight() {
        let registry = Registry::with_base_only();
        assert_eq!(registry.get_weight("SOME_NOVEL_TYPE"), DEFAULT_WEIGHT);
    }

    #[test]
    fn known_type_gets_table_weight() {
        let registry = Registry::with_base_only();
        assert_eq!(registry.get_weight("SSN"), 10);
        assert_eq!(registry.get_category("SSN"), "direct_identifier");
    }

    #[test]
    fn overlay_wins_over_base_weight() {
        let mut raw = HashMap::new();
        raw.insert("SSN".to_string(), 3);
        let overlay = WeightOverlay::from_map(raw);
        let registry = Registry::new(overlay);
        assert_eq!(registry.get_weight("SSN"), 3);
    }

    #[test]
    fn overlay_drops_out_of_range_entries() {
        let mut raw = HashMap::new();
        raw.insert("SSN".to_string(), 99);
        let overlay = WeightOverlay::from_map(raw);
        let registry = Registry::new(overlay);
        assert_eq!(registry.get_weight("SSN"), 10); // falls back to base
    }

    #[test]
    fn high_risk_types_respects_threshold() {
        let registry = Registry::with_base_only();
        let high_risk = registry.get_high_risk_types(8);
        assert!(high_risk.iter().any(|t| t == "SSN"));
        assert!(!high_risk.iter().any(|t| t == "DATE"));
    }

    #[test]
    fn vendor_alias_normalizes_to_canonical() {
        let registry = Registry::with_base_only();
        assert_eq!(registry.normalize_type("US_SSN"), "SSN");
        assert_eq!(registry.normalize_type("routing_number"), "ABA_ROUTING");
    }
}
