//! Key inference: which property holds the records, and which record field
//! identifies them.
//!
//! Both questions are answered by walking the strategy lists of an
//! [`InferenceConfig`] and returning the first success.

use serde_json::{Map, Value};

use crate::config::{ArrayKeyStrategy, EntryKeyStrategy, InferenceConfig};

// ============================================================================
// Shape accessors
// ============================================================================

/// `collection.metadata` when it is an object.
pub fn metadata_of(collection: &Value) -> Option<&Map<String, Value>> {
    collection.get("metadata").and_then(Value::as_object)
}

/// The schema array a collection carries: top-level `schema` first, then
/// `metadata.schema`.
pub fn schema_of(collection: &Value) -> Option<&Vec<Value>> {
    collection
        .get("schema")
        .and_then(Value::as_array)
        .or_else(|| metadata_of(collection)?.get("schema")?.as_array())
}

/// The record array under `array_key`, if present.
pub fn records_of<'a>(collection: &'a Value, array_key: &str) -> Option<&'a Vec<Value>> {
    collection.get(array_key).and_then(Value::as_array)
}

/// Non-empty string value of `record[field]`, i.e. the record's address.
pub fn entry_key_of<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    if field.is_empty() {
        return None;
    }
    record.get(field)?.as_str().filter(|s| !s.is_empty())
}

/// Non-empty `metadata.entry_key`.
pub fn explicit_entry_key(collection: &Value) -> Option<&str> {
    metadata_of(collection)?
        .get("entry_key")?
        .as_str()
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Array key
// ============================================================================

/// Detect the top-level property holding the record array.
pub fn detect_array_key(collection: &Value, config: &InferenceConfig) -> Option<String> {
    let obj = collection.as_object()?;
    config
        .array_key_strategies
        .iter()
        .find_map(|strategy| array_key_by(*strategy, obj, config))
}

fn array_key_by(
    strategy: ArrayKeyStrategy,
    obj: &Map<String, Value>,
    config: &InferenceConfig,
) -> Option<String> {
    match strategy {
        ArrayKeyStrategy::Candidates => config
            .array_key_candidates
            .iter()
            .find(|name| obj.get(name.as_str()).is_some_and(Value::is_array))
            .cloned(),
        ArrayKeyStrategy::FirstArray => obj
            .iter()
            .find(|(k, v)| v.is_array() && !config.is_reserved(k))
            .map(|(k, _)| k.clone()),
    }
}

// ============================================================================
// Entry key field
// ============================================================================

/// Infer the record property that uniquely identifies entries. Returns an
/// empty string when nothing qualifies; entries are then append-only.
pub fn infer_entry_key_field(
    collection: &Value,
    array_key: Option<&str>,
    config: &InferenceConfig,
) -> String {
    let sample = array_key
        .and_then(|key| records_of(collection, key))
        .and_then(|records| records.iter().find_map(Value::as_object));

    config
        .entry_key_strategies
        .iter()
        .find_map(|strategy| entry_key_by(*strategy, collection, sample, config))
        .unwrap_or_default()
}

/// Same as [`infer_entry_key_field`] for a bare record array.
pub fn infer_entry_key_field_from_records(records: &[Value], config: &InferenceConfig) -> String {
    let sample = records.iter().find_map(Value::as_object);
    config
        .entry_key_strategies
        .iter()
        .find_map(|strategy| match strategy {
            EntryKeyStrategy::SampleCandidates | EntryKeyStrategy::FirstStringField => {
                entry_key_by(*strategy, &Value::Null, sample, config)
            }
            _ => None,
        })
        .unwrap_or_default()
}

fn entry_key_by(
    strategy: EntryKeyStrategy,
    collection: &Value,
    sample: Option<&Map<String, Value>>,
    config: &InferenceConfig,
) -> Option<String> {
    let non_empty_str = |v: &Value| v.as_str().is_some_and(|s| !s.is_empty());
    match strategy {
        EntryKeyStrategy::MetadataEntryKey => explicit_entry_key(collection).map(str::to_string),
        EntryKeyStrategy::SampleCandidates => {
            let sample = sample?;
            config
                .entry_key_candidates
                .iter()
                .find(|name| sample.get(name.as_str()).is_some_and(non_empty_str))
                .cloned()
        }
        EntryKeyStrategy::SchemaFirstField => schema_of(collection)?
            .first()?
            .get("key")?
            .as_str()
            .filter(|k| !k.is_empty())
            .map(str::to_string),
        EntryKeyStrategy::FirstStringField => sample?
            .iter()
            .find(|(_, v)| non_empty_str(v))
            .map(|(k, _)| k.clone()),
    }
}
