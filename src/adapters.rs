//! Vendor-source adapters: each normalizes a vendor's native finding
//! format into the shared `NormalizedInput` contract the merger and scorer
//! consume. Only the internal text scanner has a real implementation here;
//! the rest of the taxonomy is closed (adding a vendor means adding a
//! variant here, not inventing a string) but stubbed, since wiring up
//! their respective SDKs is out of scope for this core library.

use crate::error::{OpenLabelsError, Result};
use crate::model::NormalizedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Macie,
    Dlp,
    Purview,
    Ntfs,
    Nfs,
    M365,
    Presidio,
    Scanner,
    External,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Macie => "macie",
            AdapterKind::Dlp => "dlp",
            AdapterKind::Purview => "purview",
            AdapterKind::Ntfs => "ntfs",
            AdapterKind::Nfs => "nfs",
            AdapterKind::M365 => "m365",
            AdapterKind::Presidio => "presidio",
            AdapterKind::Scanner => "scanner",
            AdapterKind::External => "external",
        }
    }
}

/// Normalizes a vendor's native payload into `NormalizedInput`. Every
/// adapter is infallible on well-formed input and returns
/// `UnsupportedPlatform` when the vendor integration isn't wired up.
pub trait Adapter {
    fn kind(&self) -> AdapterKind;
    fn normalize(&self, raw: &str) -> Result<NormalizedInput>;
}

/// The adapter for this crate's own detector pipeline's output — entities
/// and context already in `NormalizedInput` shape pass through unchanged,
/// this just exists so the scanner has a name in the same taxonomy as the
/// vendor adapters.
pub struct ScannerAdapter;

impl Adapter for ScannerAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Scanner
    }

    fn normalize(&self, raw: &str) -> Result<NormalizedInput> {
        serde_json::from_str(raw).map_err(|e| OpenLabelsError::InvalidInput { message: e.to_string() })
    }
}

macro_rules! unsupported_adapter {
    ($name:ident, $kind:expr) => {
        pub struct $name;

        impl Adapter for $name {
            fn kind(&self) -> AdapterKind {
                $kind
            }

            fn normalize(&self, _raw: &str) -> Result<NormalizedInput> {
                Err(OpenLabelsError::UnsupportedPlatform { operation: format!("{} adapter", $kind.as_str()) })
            }
        }
    };
}

unsupported_adapter!(MacieAdapter, AdapterKind::Macie);
unsupported_adapter!(DlpAdapter, AdapterKind::Dlp);
unsupported_adapter!(PurviewAdapter, AdapterKind::Purview);
unsupported_adapter!(NtfsAdapter, AdapterKind::Ntfs);
unsupported_adapter!(NfsAdapter, AdapterKind::Nfs);
unsupported_adapter!(M365Adapter, AdapterKind::M365);
unsupported_adapter!(PresidioAdapter, AdapterKind::Presidio);
unsupported_adapter!(ExternalAdapter, AdapterKind::External);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_adapter_round_trips_normalized_input() {
        let adapter = ScannerAdapter;
        let json = r#"{"entities": [], "context": {"exposure": "PRIVATE"}}"#;
        let result = adapter.normalize(json).unwrap();
        assert!(result.entities.is_empty());
    }

    #[test]
    fn unimplemented_vendor_adapters_report_unsupported() {
        let adapter = MacieAdapter;
        assert!(adapter.normalize("{}").is_err());
        assert_eq!(adapter.kind(), AdapterKind::Macie);
    }
}
