//! Data classification and risk-scoring core: entity registry, detectors,
//! orchestrator, scan-trigger engine, merger, scorer, and priority queue.

pub mod adapters;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod context;
pub mod detectors;
pub mod error;
pub mod merger;
pub mod model;
pub mod ocr;
pub mod orchestrator;
pub mod queue;
pub mod registry;
pub mod scorer;
pub mod spans;
pub mod triggers;

pub use config::Config;
pub use context::Context;
pub use error::{OpenLabelsError, Result};
pub use model::{
    DetectionMetadata, Encryption, Entity, ExposureLevel, NormalizedContext, NormalizedInput, RiskTier, ScoringResult,
    Span, Tier,
};
pub use registry::Registry;
