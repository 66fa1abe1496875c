//! Confidence tiers and adjustments shared across detectors. A detector
//! starts from one of these base tiers depending on how it found a match
//! (structural validation vs. bare pattern vs. dictionary lookup) and then
//! applies the boost/penalty constants below for context it picked up
//! along the way.

pub const VERY_HIGH: f64 = 0.98;
pub const HIGH: f64 = 0.92;
pub const MEDIUM_HIGH: f64 = 0.88;
pub const MEDIUM: f64 = 0.85;
pub const LOW: f64 = 0.75;
pub const MINIMAL: f64 = 0.65;

/// Added when a match sits next to an explicit field label ("SSN:", "DOB:").
pub const LABELED_BOOST: f64 = 0.05;
/// Subtracted when a match of a type that's normally labeled appears bare.
pub const UNLABELED_PENALTY: f64 = 0.05;
/// Subtracted when a credential-shaped match looks like a placeholder or
/// test fixture value (e.g. `sk_test_`, `xxxxxxxx`, `example`).
pub const TEST_CREDENTIAL_PENALTY: f64 = 0.08;

pub fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
