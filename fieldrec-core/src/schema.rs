//! Metadata document shape and migration.
//!
//! The current set of [`FieldDefinition`]s is fixed per build. Documents
//! written by older builds may lack fields; every read through the store
//! adds the missing ones with their defaults. Fields are never removed:
//! ids stored by a newer build and unknown here are carried along untouched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::StoreConfig;
use crate::error::{FieldrecError, Result};
use crate::filename::{CaptureDetails, CaptureLocation};
use crate::geodetic::GridSystem;
use crate::history::MetadataHistory;

/// Stable field ids.
pub mod fields {
    pub const RECORDER: &str = "recorder";
    pub const DETERMINER: &str = "determiner";
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const SCIENTIFIC_NAME: &str = "scientific-name";
    pub const COMMON_NAME: &str = "common-name";
    pub const GRIDREF: &str = "gridref";
    pub const LOCATION: &str = "location";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const HISTORY: &str = "metadata";
}

/// Time default when the capture time is unknown.
const NO_TIME: &str = "00:00";

/// One field of the current document schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub default: Value,
    pub optional: bool,
}

/// A record's structured metadata, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataDocument {
    fields: Map<String, Value>,
}

impl MetadataDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse stored bytes. Anything but a JSON object is corrupt.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| FieldrecError::CorruptDocument {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(FieldrecError::CorruptDocument {
                name: name.to_string(),
                reason: format!("expected an object, found {}", json_kind(&other)),
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.fields).map_err(|e| FieldrecError::Serialization(e.to_string()))
    }

    /// Plain-text rendering for share targets that reject structured payloads.
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.fields)
            .map_err(|e| FieldrecError::Serialization(e.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.fields.get(id)
    }

    /// String value of a field; non-string values render as JSON.
    pub fn get_str(&self, id: &str) -> Option<String> {
        self.fields.get(id).map(|v| match v {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(id.into(), value.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fields.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Value> {
        self.fields.remove(id)
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Export history for display. A missing or malformed history reads as empty.
    pub fn history(&self) -> MetadataHistory {
        self.history_for_update("").unwrap_or_default()
    }

    /// Export history that is about to be rewritten.
    ///
    /// A malformed history is a `CorruptDocument` error so that appends and
    /// trims never replace content they could not read.
    pub fn history_for_update(&self, name: &str) -> Result<MetadataHistory> {
        match self.fields.get(fields::HISTORY) {
            None | Some(Value::Null) => Ok(MetadataHistory::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                FieldrecError::CorruptDocument {
                    name: name.to_string(),
                    reason: format!("malformed {} field: {e}", fields::HISTORY),
                }
            }),
        }
    }

    pub fn set_history(&mut self, history: &MetadataHistory) -> Result<()> {
        let value =
            serde_json::to_value(history).map_err(|e| FieldrecError::Serialization(e.to_string()))?;
        self.fields.insert(fields::HISTORY.to_string(), value);
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Current document schema.
#[derive(Clone)]
pub struct Schema {
    config: StoreConfig,
    grid: Arc<dyn GridSystem>,
}

impl Schema {
    pub fn new(config: StoreConfig, grid: Arc<dyn GridSystem>) -> Self {
        Self { config, grid }
    }

    /// Field definitions for a record. Defaults for date, time and location
    /// come from the capture identity when `base_name` parses.
    pub fn field_definitions(&self, base_name: Option<&str>) -> Vec<FieldDefinition> {
        let details = base_name.and_then(|name| CaptureDetails::parse(name).ok());

        let date = details
            .as_ref()
            .map(|d| d.date_iso())
            .unwrap_or_default();
        let time = details
            .as_ref()
            .map(|d| d.captured_at.format("%H:%M").to_string())
            .unwrap_or_else(|| NO_TIME.to_string());

        let (gridref, latitude, longitude) = match details.as_ref().map(|d| &d.location) {
            Some(CaptureLocation::GridRef(gr)) => (gr.clone(), String::new(), String::new()),
            Some(CaptureLocation::LatLon {
                latitude,
                longitude,
            }) => {
                let gridref = self
                    .grid
                    .reference_at(*latitude, *longitude, self.config.georef_precision)
                    .unwrap_or_default();
                (gridref, latitude.to_string(), longitude.to_string())
            }
            None => (String::new(), String::new(), String::new()),
        };

        let empty_history = serde_json::to_value(MetadataHistory::default())
            .unwrap_or_else(|_| Value::Object(Map::new()));

        let optional = |id: &str| !self.config.required_fields.iter().any(|r| r == id);

        vec![
            FieldDefinition {
                id: fields::RECORDER,
                label: "Recorder",
                default: Value::String(self.config.default_recorder.clone()),
                optional: optional(fields::RECORDER),
            },
            FieldDefinition {
                id: fields::DETERMINER,
                label: "Determiner",
                default: Value::String(self.config.default_determiner.clone()),
                optional: optional(fields::DETERMINER),
            },
            FieldDefinition {
                id: fields::DATE,
                label: "Record date",
                default: Value::String(date),
                optional: false,
            },
            FieldDefinition {
                id: fields::TIME,
                label: "Record time",
                default: Value::String(time),
                optional: false,
            },
            FieldDefinition {
                id: fields::SCIENTIFIC_NAME,
                label: "Scientific name",
                default: Value::String(String::new()),
                optional: optional(fields::SCIENTIFIC_NAME),
            },
            FieldDefinition {
                id: fields::COMMON_NAME,
                label: "Common name",
                default: Value::String(String::new()),
                optional: optional(fields::COMMON_NAME),
            },
            FieldDefinition {
                id: fields::GRIDREF,
                label: "Grid reference",
                default: Value::String(gridref),
                optional: false,
            },
            FieldDefinition {
                id: fields::LOCATION,
                label: "Location name",
                default: Value::String(String::new()),
                optional: optional(fields::LOCATION),
            },
            FieldDefinition {
                id: fields::LATITUDE,
                label: "Latitude",
                default: Value::String(latitude),
                optional: optional(fields::LATITUDE),
            },
            FieldDefinition {
                id: fields::LONGITUDE,
                label: "Longitude",
                default: Value::String(longitude),
                optional: optional(fields::LONGITUDE),
            },
            FieldDefinition {
                id: fields::HISTORY,
                label: "Export history",
                default: empty_history,
                optional: false,
            },
        ]
    }

    /// A fresh document seeded with every default.
    pub fn new_document(&self, base_name: &str) -> MetadataDocument {
        let mut doc = MetadataDocument::new();
        for def in self.field_definitions(Some(base_name)) {
            doc.set(def.id, def.default);
        }
        doc
    }

    /// Add any missing current fields with their defaults.
    ///
    /// Returns the ids that were added; empty means the document was already current.
    pub fn migrate(&self, base_name: &str, doc: &mut MetadataDocument) -> Vec<&'static str> {
        let mut added = Vec::new();
        for def in self.field_definitions(Some(base_name)) {
            if !doc.contains(def.id) {
                doc.set(def.id, def.default);
                added.push(def.id);
            }
        }
        added
    }

    /// Mandatory fields whose value is empty.
    pub fn missing_required(&self, base_name: &str, doc: &MetadataDocument) -> Vec<&'static str> {
        self.field_definitions(Some(base_name))
            .into_iter()
            .filter(|def| !def.optional && def.id != fields::HISTORY)
            .filter(|def| doc.get_str(def.id).map(|v| v.trim().is_empty()).unwrap_or(true))
            .map(|def| def.id)
            .collect()
    }

    /// Field ids in schema order.
    pub fn field_ids(&self) -> Vec<&'static str> {
        self.field_definitions(None).iter().map(|d| d.id).collect()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn grid(&self) -> &Arc<dyn GridSystem> {
        &self.grid
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("config", &self.config)
            .field("grid", &self.grid.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodetic::GeohashGrid;

    fn schema() -> Schema {
        let config = StoreConfig {
            default_recorder: "A. Recorder".into(),
            ..Default::default()
        };
        Schema::new(config, Arc::new(GeohashGrid))
    }

    #[test]
    fn test_new_document_has_every_field() {
        let schema = schema();
        let doc = schema.new_document("20240321_140530_SU1234_10_52");

        let mut ids: Vec<&str> = doc.field_ids().map(|s| s.as_str()).collect();
        ids.sort();
        let mut expected = schema.field_ids();
        expected.sort();
        assert_eq!(ids, expected);

        assert_eq!(doc.get_str(fields::DATE).unwrap(), "2024-03-21");
        assert_eq!(doc.get_str(fields::TIME).unwrap(), "14:05");
        assert_eq!(doc.get_str(fields::GRIDREF).unwrap(), "SU1234");
        assert_eq!(doc.get_str(fields::RECORDER).unwrap(), "A. Recorder");
        assert!(doc.history().is_empty());
    }

    #[test]
    fn test_latlon_name_derives_gridref() {
        let schema = schema();
        let doc = schema.new_document("2024-03-21_14-05-30_51.50101_-0.12419_10_none");

        let gridref = doc.get_str(fields::GRIDREF).unwrap();
        assert_eq!(gridref.len(), 6);
        assert_eq!(
            gridref,
            GeohashGrid.reference_at(51.50101, -0.12419, 6).unwrap()
        );
        assert_eq!(doc.get_str(fields::LATITUDE).unwrap(), "51.50101");
    }

    #[test]
    fn test_unparseable_name_uses_blank_defaults() {
        let doc = schema().new_document("imported-recording");
        assert_eq!(doc.get_str(fields::DATE).unwrap(), "");
        assert_eq!(doc.get_str(fields::TIME).unwrap(), "00:00");
    }

    #[test]
    fn test_migrate_adds_only_missing() {
        let schema = schema();
        let mut doc = schema.new_document("20240321_140530_SU1234_10_52");
        doc.set(fields::SCIENTIFIC_NAME, "Turdus merula");
        doc.remove(fields::LOCATION);
        doc.remove(fields::HISTORY);

        let added = schema.migrate("20240321_140530_SU1234_10_52", &mut doc);
        assert_eq!(added, vec![fields::LOCATION, fields::HISTORY]);
        assert_eq!(doc.get_str(fields::SCIENTIFIC_NAME).unwrap(), "Turdus merula");

        let again = schema.migrate("20240321_140530_SU1234_10_52", &mut doc);
        assert!(again.is_empty());
    }

    #[test]
    fn test_migrate_keeps_unknown_fields() {
        let schema = schema();
        let mut doc = schema.new_document("20240321_140530_SU1234_10_52");
        doc.set("sex", "male");
        schema.migrate("20240321_140530_SU1234_10_52", &mut doc);
        assert_eq!(doc.get_str("sex").unwrap(), "male");
    }

    #[test]
    fn test_missing_required() {
        let config = StoreConfig {
            required_fields: vec![fields::SCIENTIFIC_NAME.to_string()],
            ..Default::default()
        };
        let schema = Schema::new(config, Arc::new(GeohashGrid));
        let mut doc = schema.new_document("20240321_140530_SU1234_10_52");

        assert_eq!(
            schema.missing_required("20240321_140530_SU1234_10_52", &doc),
            vec![fields::SCIENTIFIC_NAME]
        );
        doc.set(fields::SCIENTIFIC_NAME, "Erithacus rubecula");
        assert!(schema
            .missing_required("20240321_140530_SU1234_10_52", &doc)
            .is_empty());
    }

    #[test]
    fn test_from_bytes_rejects_non_objects() {
        assert!(MetadataDocument::from_bytes("x.txt", b"null").is_err());
        assert!(MetadataDocument::from_bytes("x.txt", b"[1,2]").is_err());
        assert!(MetadataDocument::from_bytes("x.txt", b"{not json").is_err());
        assert!(MetadataDocument::from_bytes("x.txt", b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_history_is_corrupt_for_update() {
        let mut doc = MetadataDocument::new();
        doc.set(fields::HISTORY, "downloaded twice");
        assert!(doc.history().is_empty());
        assert!(matches!(
            doc.history_for_update("x.txt"),
            Err(FieldrecError::CorruptDocument { .. })
        ));

        doc.set(fields::HISTORY, Value::Null);
        assert!(doc.history_for_update("x.txt").unwrap().is_empty());
        doc.set(fields::HISTORY, serde_json::json!({"shares": ["s"]}));
        assert_eq!(doc.history_for_update("x.txt").unwrap().shares, vec!["s".to_string()]);
    }

    #[test]
    fn test_history_roundtrip_through_document() {
        let mut doc = MetadataDocument::new();
        let mut history = doc.history();
        history.append(crate::history::HistoryCategory::Shares, "2024-03-21");
        doc.set_history(&history).unwrap();
        assert_eq!(doc.history().shares, vec!["2024-03-21".to_string()]);
    }
}
