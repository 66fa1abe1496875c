//! Runtime configuration, loaded from explicit values or from the
//! environment. Mirrors the upstream scanner config: validated fields,
//! forbidden data-path prefixes, and a forward-compatible schema version.

use crate::error::{OpenLabelsError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const FORBIDDEN_PATHS: &[&str] = &[
    "/etc", "/var", "/usr", "/bin", "/sbin", "/lib", "/boot", "/dev", "/proc", "/sys",
    "/System", "/Library", "C:\\Windows", "C:\\Program Files",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Auto,
    Cpu,
    Cuda,
}

impl DeviceMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "auto" => Ok(DeviceMode::Auto),
            "cpu" => Ok(DeviceMode::Cpu),
            "cuda" => Ok(DeviceMode::Cuda),
            other => Err(OpenLabelsError::InvalidInput {
                message: format!("unknown device mode: {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnModelTimeout {
    Error,
    Degraded,
}

/// Rejects data directories that live under well-known system paths —
/// scanning them would be both pointless and a permissions minefield.
pub fn validate_data_path(path: &Path) -> Result<()> {
    let s = path.to_string_lossy();
    for forbidden in FORBIDDEN_PATHS {
        if s.starts_with(forbidden) {
            return Err(OpenLabelsError::InvalidInput {
                message: format!("data path '{s}' is under forbidden prefix '{forbidden}'"),
            });
        }
    }
    Ok(())
}

fn split_csv(raw: &str) -> HashSet<String> {
    raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

pub fn default_data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("openlabels");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share").join("openlabels");
    }
    if let Ok(local) = std::env::var("LOCALAPPDATA") {
        return PathBuf::from(local).join("openlabels");
    }
    PathBuf::from(".openlabels")
}

#[derive(Debug, Clone)]
pub struct Config {
    pub schema_version: u32,
    pub data_dir: PathBuf,
    pub min_confidence: f64,
    pub entity_types: Option<HashSet<String>>,
    pub exclude_types: Option<HashSet<String>>,
    pub device: DeviceMode,
    pub cuda_device_id: Option<u32>,
    pub enable_ocr: bool,
    pub model_timeout_seconds: u64,
    pub on_model_timeout: OnModelTimeout,
    pub disabled_detectors: HashSet<String>,
    pub max_workers: usize,
    pub max_text_size: usize,
    pub max_file_size: usize,
    pub weights_file: Option<PathBuf>,
    /// When set, a detector failure or timeout aborts the whole scan with
    /// an `Err` instead of being folded into `DetectionMetadata` as a
    /// warning. Off by default: a degraded-but-complete result is more
    /// useful to most callers than an all-or-nothing scan.
    pub strict_mode: bool,
    /// Entity types dropped by the orchestrator's clinical-context filter
    /// before dedup, because they aren't identifying on their own. Defaults
    /// to just `LAB_TEST`: `DIAGNOSIS` stays in by default since it's the
    /// primary `health_info` signal the `hipaa_phi` co-occurrence rule
    /// depends on, and filtering it out unconditionally would make that
    /// rule unreachable from real span detection.
    pub clinical_context_types: HashSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schema_version: CURRENT_SCHEMA_VERSION,
            data_dir: default_data_dir(),
            min_confidence: 0.50,
            entity_types: None,
            exclude_types: None,
            device: DeviceMode::Auto,
            cuda_device_id: None,
            enable_ocr: true,
            model_timeout_seconds: 45,
            on_model_timeout: OnModelTimeout::Degraded,
            disabled_detectors: HashSet::new(),
            max_workers: num_cpus::get().max(1),
            max_text_size: 10 * 1024 * 1024,
            max_file_size: 100 * 1024 * 1024,
            weights_file: None,
            strict_mode: false,
            clinical_context_types: ["LAB_TEST"].into_iter().map(String::from).collect(),
        }
    }
}

impl Config {
    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn rapidocr_dir(&self) -> PathBuf {
        self.models_dir().join("rapidocr")
    }

    pub fn dictionaries_dir(&self) -> PathBuf {
        self.data_dir.join("dictionaries")
    }

    /// Validates field invariants. Called after construction, whether the
    /// config came from `from_env` or was hand-built by a caller.
    pub fn validate(&self) -> Result<()> {
        validate_data_path(&self.data_dir)?;
        if !(0.0 < self.min_confidence && self.min_confidence <= 1.0) {
            return Err(OpenLabelsError::InvalidInput {
                message: format!("min_confidence {} not in (0,1]", self.min_confidence),
            });
        }
        if self.max_workers == 0 {
            return Err(OpenLabelsError::InvalidInput {
                message: "max_workers must be >= 1".to_string(),
            });
        }
        if self.max_text_size == 0 {
            return Err(OpenLabelsError::InvalidInput {
                message: "max_text_size must be >= 1".to_string(),
            });
        }
        if self.max_file_size == 0 {
            return Err(OpenLabelsError::InvalidInput {
                message: "max_file_size must be >= 1".to_string(),
            });
        }
        if self.device == DeviceMode::Cuda && self.cuda_device_id.is_none() {
            return Err(OpenLabelsError::InvalidInput {
                message: "device=cuda requires cuda_device_id to be set".to_string(),
            });
        }
        Ok(())
    }

    /// Builds a config from environment variables, falling back to defaults
    /// for anything unset. Values that fail validation are rejected with
    /// `InvalidInput` rather than silently clamped.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(home) = std::env::var("OPENLABELS_SCANNER_HOME") {
            config.data_dir = PathBuf::from(home);
        }
        if let Ok(models) = std::env::var("OPENLABELS_SCANNER_MODELS_DIR") {
            config.data_dir = PathBuf::from(models)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or(config.data_dir);
        }
        if let Ok(min_conf) = std::env::var("OPENLABELS_SCANNER_MIN_CONFIDENCE") {
            config.min_confidence = min_conf.parse().map_err(|_| OpenLabelsError::InvalidInput {
                message: format!("OPENLABELS_SCANNER_MIN_CONFIDENCE not a float: {min_conf}"),
            })?;
        }
        if let Ok(device) = std::env::var("OPENLABELS_SCANNER_DEVICE") {
            config.device = DeviceMode::parse(&device)?;
        }
        if let Ok(ocr) = std::env::var("OPENLABELS_SCANNER_ENABLE_OCR") {
            config.enable_ocr = matches!(ocr.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(workers) = std::env::var("OPENLABELS_SCANNER_MAX_WORKERS") {
            config.max_workers = workers.parse().map_err(|_| OpenLabelsError::InvalidInput {
                message: format!("OPENLABELS_SCANNER_MAX_WORKERS not an integer: {workers}"),
            })?;
        }
        if let Ok(weights) = std::env::var("OPENLABELS_WEIGHTS_FILE") {
            config.weights_file = Some(PathBuf::from(weights));
        }
        if let Ok(types) = std::env::var("OPENLABELS_SCANNER_ENTITY_TYPES") {
            config.entity_types = Some(split_csv(&types));
        }
        if let Ok(types) = std::env::var("OPENLABELS_SCANNER_EXCLUDE_TYPES") {
            config.exclude_types = Some(split_csv(&types));
        }
        if let Ok(names) = std::env::var("OPENLABELS_SCANNER_DISABLED_DETECTORS") {
            config.disabled_detectors = split_csv(&names);
        }
        if let Ok(cuda_id) = std::env::var("OPENLABELS_SCANNER_CUDA_DEVICE_ID") {
            config.cuda_device_id = Some(cuda_id.parse().map_err(|_| OpenLabelsError::InvalidInput {
                message: format!("OPENLABELS_SCANNER_CUDA_DEVICE_ID not an integer: {cuda_id}"),
            })?);
        }
        if let Ok(max_text) = std::env::var("OPENLABELS_SCANNER_MAX_TEXT_SIZE") {
            config.max_text_size = max_text.parse().map_err(|_| OpenLabelsError::InvalidInput {
                message: format!("OPENLABELS_SCANNER_MAX_TEXT_SIZE not an integer: {max_text}"),
            })?;
        }
        if let Ok(max_file) = std::env::var("OPENLABELS_SCANNER_MAX_FILE_SIZE") {
            config.max_file_size = max_file.parse().map_err(|_| OpenLabelsError::InvalidInput {
                message: format!("OPENLABELS_SCANNER_MAX_FILE_SIZE not an integer: {max_file}"),
            })?;
        }
        if let Ok(on_timeout) = std::env::var("OPENLABELS_SCANNER_ON_MODEL_TIMEOUT") {
            config.on_model_timeout = match on_timeout.trim().to_lowercase().as_str() {
                "error" => OnModelTimeout::Error,
                "degraded" => OnModelTimeout::Degraded,
                other => {
                    return Err(OpenLabelsError::InvalidInput {
                        message: format!("unknown on_model_timeout mode: {other}"),
                    })
                }
            };
        }
        if let Ok(strict) = std::env::var("OPENLABELS_SCANNER_STRICT_MODE") {
            config.strict_mode = matches!(strict.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Forward-compatibility shim: an unknown (newer) schema version is
    /// logged and the config continues with the fields we understand.
    /// There has only ever been schema version 1, so this is currently a
    /// no-op other than the warning — it exists so a future version bump
    /// has somewhere to add real field migrations.
    pub fn migrate(mut self, found_version: u32) -> (Self, Option<OpenLabelsError>) {
        if found_version == CURRENT_SCHEMA_VERSION {
            return (self, None);
        }
        let err = OpenLabelsError::SchemaMismatch {
            found: found_version,
            expected: CURRENT_SCHEMA_VERSION,
        };
        tracing::warn!(found_version, expected = CURRENT_SCHEMA_VERSION, "config schema mismatch, migrating");
        self.schema_version = CURRENT_SCHEMA_VERSION;
        (self, Some(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_forbidden_data_paths() {
        assert!(validate_data_path(Path::new("/etc/openlabels")).is_err());
        assert!(validate_data_path(Path::new("/var/lib/openlabels")).is_err());
        assert!(validate_data_path(Path::new("/home/user/openlabels")).is_ok());
    }

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let mut config = Config::default();
        config.min_confidence = 1.5;
        assert!(config.validate().is_err());
        config.min_confidence = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn migrate_is_noop_on_current_version() {
        let config = Config::default();
        let (migrated, err) = config.migrate(CURRENT_SCHEMA_VERSION);
        assert!(err.is_none());
        assert_eq!(migrated.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn cuda_device_without_id_is_rejected() {
        let mut config = Config::default();
        config.device = DeviceMode::Cuda;
        assert!(config.validate().is_err());
        config.cuda_device_id = Some(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_size_limits_are_rejected() {
        let mut config = Config::default();
        config.max_text_size = 0;
        assert!(config.validate().is_err());
        config = Config::default();
        config.max_file_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn migrate_warns_on_mismatch() {
        let config = Config::default();
        let (migrated, err) = config.migrate(99);
        assert!(err.is_some());
        assert_eq!(migrated.schema_version, CURRENT_SCHEMA_VERSION);
    }
}
