use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::infer::entry_key_of;
use crate::types::{EntriesPatch, Field, MetadataPatch, Patch, SchemaPatch};

// ============================================================================
// Public API
// ============================================================================

/// Apply `patch` to a copy of `base` and return the merged collection.
///
/// Entries matched by key are shallow-merged (`{...existing, ...incoming}`);
/// unaddressable or unknown entries are appended. Repeated application is
/// only idempotent when `remove_keys` and `upsert` target disjoint keys.
pub fn apply_patch(base: &Value, patch: &Patch) -> Value {
    let mut root = match base {
        Value::Object(obj) => obj.clone(),
        _ => Map::new(),
    };

    apply_metadata(&mut root, &patch.metadata);
    apply_schema(&mut root, &patch.schema);
    apply_entries(&mut root, patch);

    Value::Object(root)
}

// ============================================================================
// Metadata
// ============================================================================

fn apply_metadata(root: &mut Map<String, Value>, patch: &MetadataPatch) {
    if patch.is_empty() {
        return;
    }
    let mut meta = object_at(root, "metadata");
    for (key, value) in &patch.set {
        meta.insert(key.clone(), value.clone());
    }
    for key in &patch.unset {
        meta.shift_remove(key);
    }
    root.insert("metadata".to_string(), Value::Object(meta));
}

// ============================================================================
// Schema
// ============================================================================

fn apply_schema(root: &mut Map<String, Value>, patch: &SchemaPatch) {
    if patch.is_empty() {
        return;
    }

    // Keep the schema where the base keeps it; default to metadata.schema.
    let top_level = root.get("schema").is_some_and(Value::is_array)
        && !root
            .get("metadata")
            .and_then(|m| m.get("schema"))
            .is_some_and(Value::is_array);

    let existing: Vec<Value> = if top_level {
        root.get("schema").and_then(Value::as_array).cloned()
    } else {
        root.get("metadata")
            .and_then(|m| m.get("schema"))
            .and_then(Value::as_array)
            .cloned()
    }
    .unwrap_or_default();

    // A schema emptied by removals is dropped rather than left as `[]`.
    let merged = merge_schema(&existing, patch);
    let emptied = merged.is_empty() && !patch.remove_keys.is_empty();
    if top_level {
        if emptied {
            root.shift_remove("schema");
        } else {
            root.insert("schema".to_string(), Value::Array(merged));
        }
    } else {
        let mut meta = object_at(root, "metadata");
        if emptied {
            meta.shift_remove("schema");
        } else {
            meta.insert("schema".to_string(), Value::Array(merged));
        }
        root.insert("metadata".to_string(), Value::Object(meta));
    }
}

/// Existing order first (minus removals, upserts replaced in place), then
/// genuinely new keys in patch order.
fn merge_schema(existing: &[Value], patch: &SchemaPatch) -> Vec<Value> {
    let removed: HashSet<&str> = patch.remove_keys.iter().map(String::as_str).collect();
    let mut upserts: HashMap<&str, &Field> = HashMap::new();
    let mut upsert_order: Vec<&str> = Vec::new();
    for field in &patch.upsert {
        if upserts.insert(field.key.as_str(), field).is_none() {
            upsert_order.push(field.key.as_str());
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(existing.len() + upsert_order.len());

    for value in existing {
        let key = value.get("key").and_then(Value::as_str);
        match key {
            Some(k) if removed.contains(k) && !upserts.contains_key(k) => continue,
            Some(k) => {
                if !seen.insert(k.to_string()) {
                    continue;
                }
                match upserts.get(k) {
                    Some(field) => out.push(field.to_value()),
                    None => out.push(value.clone()),
                }
            }
            // Keyless definitions cannot be addressed; keep them as they are.
            None => out.push(value.clone()),
        }
    }

    for key in upsert_order {
        if !seen.contains(key) {
            if let Some(field) = upserts.get(key) {
                out.push(field.to_value());
            }
        }
    }
    out
}

// ============================================================================
// Entries
// ============================================================================

fn apply_entries(root: &mut Map<String, Value>, patch: &Patch) {
    let entries: &EntriesPatch = &patch.entries;
    if entries.is_empty() {
        return;
    }
    let key_field = patch.entry_key_field.as_str();

    let mut records: Vec<Value> = root
        .get(&patch.target_array_key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if !entries.remove_keys.is_empty() {
        let removed: HashSet<&str> = entries.remove_keys.iter().map(String::as_str).collect();
        records.retain(|r| entry_key_of(r, key_field).map_or(true, |k| !removed.contains(k)));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        if let Some(key) = entry_key_of(record, key_field) {
            index.entry(key.to_string()).or_insert(i);
        }
    }

    for incoming in &entries.upsert {
        let Some(key) = entry_key_of(incoming, key_field) else {
            records.push(incoming.clone());
            continue;
        };
        match index.get(key) {
            Some(&i) => {
                let merged = shallow_merge(&records[i], incoming);
                records[i] = merged;
            }
            None => {
                index.insert(key.to_string(), records.len());
                records.push(incoming.clone());
            }
        }
    }

    root.insert(patch.target_array_key.clone(), Value::Array(records));
}

/// `{...existing, ...incoming}`; a non-object on either side yields
/// `incoming`.
pub fn shallow_merge(existing: &Value, incoming: &Value) -> Value {
    match (existing, incoming) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = old.clone();
            for (k, v) in new {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        _ => incoming.clone(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Copy of the object at `root[key]`; empty when absent or not an object.
/// Re-inserting under the same key keeps its position.
fn object_at(root: &Map<String, Value>, key: &str) -> Map<String, Value> {
    root.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
