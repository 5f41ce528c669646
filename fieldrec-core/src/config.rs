//! Store configuration
//!
//! Handles loading configuration from environment variables with sensible defaults.
//! The store reads configuration but never persists it.

use crate::geodetic::GeorefFormat;

/// Default display precision for grid references (geohash characters).
pub const DEFAULT_GEOREF_PRECISION: usize = 6;

/// Record store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Asset-only mode: records are recordings alone, no metadata documents (default: false)
    pub legacy_mode: bool,
    /// Default value of the `recorder` field
    pub default_recorder: String,
    /// Default value of the `determiner` field
    pub default_determiner: String,
    /// Optional field ids promoted to mandatory
    pub required_fields: Vec<String>,
    /// Append download/share/csv events to record history (default: true)
    pub record_history: bool,
    /// Grid used for references derived from a lat/lon fix (default: geohash)
    pub georef_format: GeorefFormat,
    /// Precision of derived references, in the units of `georef_format` (default: 6)
    pub georef_precision: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            legacy_mode: false,
            default_recorder: String::new(),
            default_determiner: String::new(),
            required_fields: Vec::new(),
            record_history: true,
            georef_format: GeorefFormat::Geohash,
            georef_precision: DEFAULT_GEOREF_PRECISION,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let legacy_mode = std::env::var("FIELDREC_LEGACY_MODE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let default_recorder = std::env::var("FIELDREC_DEFAULT_RECORDER").unwrap_or_default();

        let default_determiner = std::env::var("FIELDREC_DEFAULT_DETERMINER").unwrap_or_default();

        let required_fields = std::env::var("FIELDREC_REQUIRED_FIELDS")
            .ok()
            .map(|fields| parse_list(&fields))
            .unwrap_or_default();

        let record_history = std::env::var("FIELDREC_RECORD_HISTORY")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let georef_format: GeorefFormat = std::env::var("FIELDREC_GEOREF_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        let georef_precision = std::env::var("FIELDREC_GEOREF_PRECISION")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|p| georef_format.accepts_precision(*p))
            .unwrap_or_else(|| georef_format.default_precision());

        Self {
            legacy_mode,
            default_recorder,
            default_determiner,
            required_fields,
            record_history,
            georef_format,
            georef_precision,
        }
    }

    /// Derive new references on `format` at its default precision.
    pub fn with_georef_format(mut self, format: GeorefFormat) -> Self {
        self.georef_format = format;
        self.georef_precision = format.default_precision();
        self
    }

    /// Builder-style toggle for asset-only mode.
    pub fn with_legacy_mode(mut self, legacy_mode: bool) -> Self {
        self.legacy_mode = legacy_mode;
        self
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
