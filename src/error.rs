//! Crate-wide error taxonomy.
//!
//! Mirrors the error kinds the scanning pipeline can surface. Detector-level
//! failures are almost always recovered locally (folded into
//! `DetectionMetadata`) rather than propagated; the variants here exist for
//! the cases that do cross an API boundary, and for strict-mode callers that
//! want the raw error instead of a degraded result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenLabelsError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("detector '{detector}' exceeded its {budget_ms}ms budget")]
    DetectorTimeout { detector: String, budget_ms: u64 },

    #[error("detector '{detector}' failed: {message}")]
    DetectorFailure { detector: String, message: String },

    #[error("queue at capacity ({capacity})")]
    QueueFull { capacity: usize },

    #[error("resource unavailable: {resource}")]
    ResourceUnavailable { resource: String },

    #[error("config schema mismatch: found {found}, expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("unsupported platform operation: {operation}")]
    UnsupportedPlatform { operation: String },
}

pub type Result<T> = std::result::Result<T, OpenLabelsError>;
