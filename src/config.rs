//! Inference configuration.
//!
//! Every heuristic used to locate the record array and the entry key field
//! is listed here as data, so callers can reorder or replace it. The struct
//! deserializes with `#[serde(default)]`, so a partial JSON document only
//! overrides what it names.

use serde::{Deserialize, Serialize};

/// Ordered strategies for finding the record array of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayKeyStrategy {
    /// First name from `array_key_candidates` whose value is an array.
    Candidates,
    /// First top-level array property in document order, skipping
    /// `reserved_keys`.
    FirstArray,
}

/// Ordered strategies for finding the entry key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKeyStrategy {
    /// Non-empty `metadata.entry_key`.
    MetadataEntryKey,
    /// First name from `entry_key_candidates` holding a non-empty string on
    /// the sample record.
    SampleCandidates,
    /// Key of the first declared schema field.
    SchemaFirstField,
    /// First non-empty string property of the sample record.
    FirstStringField,
}

impl ArrayKeyStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ArrayKeyStrategy::Candidates => "candidates",
            ArrayKeyStrategy::FirstArray => "first_array",
        }
    }
}

impl EntryKeyStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            EntryKeyStrategy::MetadataEntryKey => "metadata_entry_key",
            EntryKeyStrategy::SampleCandidates => "sample_candidates",
            EntryKeyStrategy::SchemaFirstField => "schema_first_field",
            EntryKeyStrategy::FirstStringField => "first_string_field",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub array_key_strategies: Vec<ArrayKeyStrategy>,
    pub array_key_candidates: Vec<String>,
    /// Top-level properties never treated as the record array.
    pub reserved_keys: Vec<String>,
    pub entry_key_strategies: Vec<EntryKeyStrategy>,
    pub entry_key_candidates: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            array_key_strategies: vec![ArrayKeyStrategy::Candidates, ArrayKeyStrategy::FirstArray],
            array_key_candidates: to_strings(&["entries", "records", "items", "cards"]),
            reserved_keys: to_strings(&["metadata", "schema"]),
            entry_key_strategies: vec![
                EntryKeyStrategy::MetadataEntryKey,
                EntryKeyStrategy::SampleCandidates,
                EntryKeyStrategy::SchemaFirstField,
                EntryKeyStrategy::FirstStringField,
            ],
            entry_key_candidates: to_strings(&[
                "id", "key", "uid", "uuid", "slug", "code", "term", "word",
            ]),
        }
    }
}

impl InferenceConfig {
    /// Parse a JSON document; omitted fields keep their defaults.
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Array key used when neither input nor base has a record array.
    pub fn default_array_key(&self) -> &str {
        self.array_key_candidates
            .first()
            .map(String::as_str)
            .unwrap_or("entries")
    }

    pub fn is_reserved(&self, key: &str) -> bool {
        self.reserved_keys.iter().any(|r| r == key)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
