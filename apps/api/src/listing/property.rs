//! Property record: the opaque listing data a run is generated from.
//!
//! The core never interprets the record as a whole. It only pulls out the
//! sub-views some writers need (neighborhood context, an explicit feature list).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::listing::options::ConfigurationError;

/// Keys that belong to the request, not the listing.
const REQUEST_KEYS: &[&str] = &["language", "tone"];

/// Keys carrying location / surroundings context for the neighborhood writer.
const NEIGHBORHOOD_KEYS: &[&str] = &[
    "location",
    "address",
    "neighborhood",
    "city",
    "district",
    "nearby",
    "amenities",
    "schools",
    "transport",
];

/// Immutable listing data for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord(Map<String, Value>);

impl PropertyRecord {
    /// Accepts any JSON object. `language` / `tone` keys are removed because
    /// they are run settings, not listing facts.
    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        match value {
            Value::Object(mut map) => {
                for key in REQUEST_KEYS {
                    map.remove(*key);
                }
                Ok(Self(map))
            }
            _ => Err(ConfigurationError::PropertyNotObject),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Pretty JSON view of the whole record, for prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Only the location-related fields, for the neighborhood writer.
    pub fn neighborhood_view(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(k, _)| NEIGHBORHOOD_KEYS.contains(&k.to_lowercase().as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn neighborhood_prompt_json(&self) -> String {
        let view = self.neighborhood_view();
        if view.is_empty() {
            return "{}".to_string();
        }
        serde_json::to_string_pretty(&view).unwrap_or_else(|_| "{}".to_string())
    }

    /// Explicit enumeration of the listed features, so the key-features writer
    /// has nothing to invent from.
    ///
    /// - numbers and strings → `"name: value"`
    /// - `true` → `"name"`
    /// - `false` / null / nested values → omitted
    pub fn listed_features(&self) -> Vec<String> {
        let Some(Value::Object(features)) = self.0.get("features") else {
            return Vec::new();
        };

        features
            .iter()
            .filter_map(|(name, value)| {
                let label = name.replace('_', " ");
                match value {
                    Value::Bool(true) => Some(label),
                    Value::Number(n) => Some(format!("{label}: {n}")),
                    Value::String(s) if !s.trim().is_empty() => Some(format!("{label}: {}", s.trim())),
                    _ => None,
                }
            })
            .collect()
    }
}
