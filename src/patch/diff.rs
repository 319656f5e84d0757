use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::{Map, Value};

use super::changeset::{
    create_changeset, has_field_change, merge_changesets, minimal_delta, record_changes, Changeset,
};
use super::equal::values_equal;
use crate::classify::{classify, InputKind};
use crate::config::InferenceConfig;
use crate::infer::{
    detect_array_key, entry_key_of, explicit_entry_key, infer_entry_key_field,
    infer_entry_key_field_from_records, metadata_of, records_of, schema_of,
};
use crate::types::{fields_from_value, Field, MetadataPatch, Patch, SchemaPatch};

// ============================================================================
// Options & results
// ============================================================================

/// Options for [`compute_patch`].
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// For `full` inputs, remove base entries the input does not mention.
    pub replace_semantics: bool,
    pub inference: InferenceConfig,
}

impl DiffOptions {
    pub fn replace() -> Self {
        Self {
            replace_semantics: true,
            ..Default::default()
        }
    }
}

/// Advisory findings surfaced for review before commit. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchWarning {
    /// Input shape not recognized; the patch is empty.
    UnrecognizedInput,
    /// Records were matched without an entry key field, so every incoming
    /// record is appended.
    MissingEntryKey { array_key: String },
    /// Elements of the record array that are not objects were ignored.
    NonObjectEntries { count: usize },
}

impl fmt::Display for PatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchWarning::UnrecognizedInput => {
                write!(f, "Unrecognized input shape; nothing will change")
            }
            PatchWarning::MissingEntryKey { array_key } => write!(
                f,
                "No unique entry key found for \"{array_key}\"; entries will be appended"
            ),
            PatchWarning::NonObjectEntries { count } => {
                write!(f, "Ignored {count} entries that are not objects")
            }
        }
    }
}

/// Changed fields of one matched entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChange {
    pub key: String,
    pub fields: Changeset,
}

/// Counts behind the human-readable change summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub metadata_set: usize,
    pub metadata_unset: usize,
    pub schema_added: usize,
    pub schema_changed: usize,
    pub schema_removed: usize,
    pub entries_added: usize,
    pub entries_updated: usize,
    pub entries_removed: usize,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        *self == ChangeSummary::default()
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes");
        }
        write!(
            f,
            "metadata: {} set, {} unset; schema: {} added, {} changed, {} removed; \
             entries: {} added, {} updated, {} removed",
            self.metadata_set,
            self.metadata_unset,
            self.schema_added,
            self.schema_changed,
            self.schema_removed,
            self.entries_added,
            self.entries_updated,
            self.entries_removed
        )
    }
}

/// Result of [`compute_patch`].
#[derive(Debug, Clone, PartialEq)]
pub struct PatchComputation {
    pub kind: InputKind,
    pub patch: Patch,
    pub warnings: Vec<PatchWarning>,
    pub summary: ChangeSummary,
    /// Review view of `patch.entries.upsert`: new entries in full, edited
    /// entries reduced to their key and changed fields.
    pub upsert_minimal: Vec<Value>,
    pub entry_changes: Vec<EntryChange>,
    /// Union of the changed fields over all updated entries.
    pub changed_fields: Changeset,
}

impl PatchComputation {
    /// True when some updated entry changes `field`.
    pub fn touches_field(&self, field: &str) -> bool {
        has_field_change(&self.changed_fields, field)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Compute the patch that turns `base` into what `input` describes.
///
/// Pure: equal `(base, input, options)` always produce equal results.
pub fn compute_patch(base: &Value, input: &Value, options: &DiffOptions) -> PatchComputation {
    let config = &options.inference;
    let kind = classify(input, config);

    let base_array_key = detect_array_key(base, config);
    let input_array_key = match kind {
        InputKind::Entries | InputKind::Unknown => None,
        _ => detect_array_key(input, config),
    };
    let target_array_key = input_array_key
        .clone()
        .or_else(|| base_array_key.clone())
        .unwrap_or_else(|| config.default_array_key().to_string());

    let input_records: &[Value] = match kind {
        InputKind::Entries => input.as_array().map(Vec::as_slice).unwrap_or_default(),
        InputKind::Unknown => &[],
        _ => input_array_key
            .as_deref()
            .and_then(|key| records_of(input, key))
            .map(Vec::as_slice)
            .unwrap_or_default(),
    };

    let entry_key_field = resolve_entry_key_field(
        base,
        input,
        kind,
        input_records,
        input_array_key.as_deref(),
        base_array_key.as_deref(),
        config,
    );

    let mut out = PatchComputation {
        kind,
        patch: Patch::new(target_array_key, entry_key_field),
        warnings: Vec::new(),
        summary: ChangeSummary::default(),
        upsert_minimal: Vec::new(),
        entry_changes: Vec::new(),
        changed_fields: create_changeset(),
    };

    if kind == InputKind::Unknown {
        out.warnings.push(PatchWarning::UnrecognizedInput);
        return out;
    }

    if kind.carries_metadata() {
        if let Some(input_meta) = metadata_of(input) {
            diff_metadata(
                metadata_of(base),
                input_meta,
                &mut out.patch.metadata,
                &mut out.summary,
            );
        }
    }

    let input_schema = match (kind, input) {
        (InputKind::Schema, Value::Array(_)) => Some(fields_from_value(input)),
        _ => schema_of(input)
            .map(|arr| arr.iter().filter_map(Field::from_value).collect())
            // A full replacement without a schema drops the base schema.
            .or_else(|| (kind == InputKind::Full && options.replace_semantics).then(Vec::new)),
    };
    if let Some(new_fields) = input_schema {
        let old_fields = schema_of(base)
            .map(|arr| arr.iter().filter_map(Field::from_value).collect::<Vec<_>>())
            .unwrap_or_default();
        diff_schema(&old_fields, &new_fields, &mut out.patch.schema, &mut out.summary);
    }

    if kind.carries_entries() {
        let removals = kind == InputKind::Full
            && options.replace_semantics
            && input_array_key.is_some();
        diff_entries(base, input_records, removals, &mut out);
    }

    out
}

// ============================================================================
// Key resolution
// ============================================================================

/// Input-implied values win over base-implied ones; explicit
/// `metadata.entry_key` wins over sampling.
fn resolve_entry_key_field(
    base: &Value,
    input: &Value,
    kind: InputKind,
    input_records: &[Value],
    input_array_key: Option<&str>,
    base_array_key: Option<&str>,
    config: &InferenceConfig,
) -> String {
    if let Some(explicit) = explicit_entry_key(input).or_else(|| explicit_entry_key(base)) {
        return explicit.to_string();
    }
    let from_input = match kind {
        InputKind::Entries => infer_entry_key_field_from_records(input_records, config),
        InputKind::Unknown => String::new(),
        _ => infer_entry_key_field(input, input_array_key, config),
    };
    if !from_input.is_empty() {
        return from_input;
    }
    infer_entry_key_field(base, base_array_key, config)
}

// ============================================================================
// Metadata
// ============================================================================

fn diff_metadata(
    base_meta: Option<&Map<String, Value>>,
    input_meta: &Map<String, Value>,
    patch: &mut MetadataPatch,
    summary: &mut ChangeSummary,
) {
    for (key, new_value) in input_meta {
        if key == "schema" {
            continue;
        }
        let unchanged = base_meta
            .and_then(|m| m.get(key))
            .is_some_and(|old| values_equal(old, new_value));
        if !unchanged {
            patch.set.insert(key.clone(), new_value.clone());
            summary.metadata_set += 1;
        }
    }

    for key in base_meta.into_iter().flat_map(|m| m.keys()) {
        if key != "schema" && !input_meta.contains_key(key) {
            patch.unset.push(key.clone());
            summary.metadata_unset += 1;
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

fn diff_schema(
    old_fields: &[Field],
    new_fields: &[Field],
    patch: &mut SchemaPatch,
    summary: &mut ChangeSummary,
) {
    let old_by_key: HashMap<&str, &Field> =
        old_fields.iter().map(|f| (f.key.as_str(), f)).collect();
    let mut new_keys: HashSet<&str> = HashSet::new();

    for field in new_fields {
        if !new_keys.insert(field.key.as_str()) {
            continue;
        }
        match old_by_key.get(field.key.as_str()) {
            None => {
                patch.upsert.push(field.clone());
                summary.schema_added += 1;
            }
            Some(old) if !values_equal(&old.to_value(), &field.to_value()) => {
                patch.upsert.push(field.clone());
                summary.schema_changed += 1;
            }
            Some(_) => {}
        }
    }

    let mut removed: HashSet<&str> = HashSet::new();
    for field in old_fields {
        if !new_keys.contains(field.key.as_str()) && removed.insert(field.key.as_str()) {
            patch.remove_keys.push(field.key.clone());
            summary.schema_removed += 1;
        }
    }
}

// ============================================================================
// Entries
// ============================================================================

fn diff_entries(
    base: &Value,
    input_records: &[Value],
    removals: bool,
    out: &mut PatchComputation,
) {
    let key_field = out.patch.entry_key_field.clone();
    let base_records: &[Value] = records_of(base, &out.patch.target_array_key)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut base_by_key: HashMap<&str, &Map<String, Value>> = HashMap::new();
    for record in base_records {
        if let (Some(key), Some(obj)) = (entry_key_of(record, &key_field), record.as_object()) {
            base_by_key.entry(key).or_insert(obj);
        }
    }

    if key_field.is_empty() && !input_records.is_empty() {
        out.warnings.push(PatchWarning::MissingEntryKey {
            array_key: out.patch.target_array_key.clone(),
        });
    }

    // Keyless base records, matched by value so an unchanged one is not
    // appended again.
    let mut base_anonymous: Vec<Option<&Value>> = base_records
        .iter()
        .filter(|r| r.is_object() && entry_key_of(r, &key_field).is_none())
        .map(Some)
        .collect();

    let mut input_keys: HashSet<&str> = HashSet::new();
    let mut non_objects = 0usize;

    for record in input_records {
        let Some(incoming) = record.as_object() else {
            non_objects += 1;
            continue;
        };
        let existing = match entry_key_of(record, &key_field) {
            Some(key) => {
                input_keys.insert(key);
                base_by_key.get(key).map(|obj| (key, *obj))
            }
            None => {
                let twin = base_anonymous
                    .iter_mut()
                    .find(|slot| (**slot).is_some_and(|old| values_equal(old, record)));
                if let Some(slot) = twin {
                    *slot = None;
                    continue;
                }
                None
            }
        };

        match existing {
            None => {
                out.patch.entries.upsert.push(record.clone());
                out.upsert_minimal.push(record.clone());
                out.summary.entries_added += 1;
            }
            Some((key, existing)) => {
                let changes = record_changes(existing, incoming);
                if changes.is_empty() {
                    continue;
                }
                out.patch.entries.upsert.push(record.clone());
                out.upsert_minimal
                    .push(minimal_delta(incoming, &changes, &key_field));
                out.changed_fields = merge_changesets(&out.changed_fields, &changes);
                out.entry_changes.push(EntryChange {
                    key: key.to_string(),
                    fields: changes,
                });
                out.summary.entries_updated += 1;
            }
        }
    }

    if non_objects > 0 {
        out.warnings
            .push(PatchWarning::NonObjectEntries { count: non_objects });
    }

    if removals {
        let mut removed: HashSet<&str> = HashSet::new();
        for record in base_records {
            if let Some(key) = entry_key_of(record, &key_field) {
                if !input_keys.contains(key) && removed.insert(key) {
                    out.patch.entries.remove_keys.push(key.to_string());
                    out.summary.entries_removed += 1;
                }
            }
        }
    }
}
