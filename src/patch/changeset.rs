use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::equal::values_equal;

/// Set of record field names that an incoming record changes.
/// Examples: "val", "tags", "notes"
pub type Changeset = BTreeSet<String>;

/// Create a new empty changeset.
pub fn create_changeset() -> Changeset {
    BTreeSet::new()
}

/// Fields of `incoming` whose value is missing from or different in
/// `existing`.
///
/// Only keys present on `incoming` are inspected: applying a patch merges
/// shallowly, so keys the incoming record omits keep their old value.
pub fn record_changes(existing: &Map<String, Value>, incoming: &Map<String, Value>) -> Changeset {
    incoming
        .iter()
        .filter(|(k, v)| existing.get(k.as_str()).map_or(true, |old| !values_equal(old, v)))
        .map(|(k, _)| k.clone())
        .collect()
}

/// Check whether a field is part of the changeset.
pub fn has_field_change(changeset: &Changeset, field: &str) -> bool {
    changeset.contains(field)
}

/// Merge two changesets (union).
pub fn merge_changesets(a: &Changeset, b: &Changeset) -> Changeset {
    a.union(b).cloned().collect()
}

/// Project `incoming` onto the changed fields, keeping the key field so the
/// delta stays addressable.
pub fn minimal_delta(
    incoming: &Map<String, Value>,
    changeset: &Changeset,
    key_field: &str,
) -> Value {
    let delta: Map<String, Value> = incoming
        .iter()
        .filter(|(k, _)| k.as_str() == key_field || changeset.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(delta)
}
