use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Schema fields
// ============================================================================

/// One schema element of a collection (`metadata.schema[i]`).
///
/// Properties other than `key`, `label` and `type` are kept in `extra` so
/// they survive a diff/apply cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Field {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
            field_type: None,
            extra: Map::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    /// Lenient read of a pasted field definition. Returns `None` unless the
    /// value is an object with a non-empty string `key`. A non-string
    /// `label`/`type` is kept verbatim in `extra`.
    pub fn from_value(value: &Value) -> Option<Field> {
        let obj = value.as_object()?;
        let key = obj.get("key")?.as_str().filter(|k| !k.is_empty())?;
        let mut field = Field::new(key);
        for (name, v) in obj {
            match (name.as_str(), v) {
                ("key", _) => {}
                ("label", Value::String(s)) => field.label = Some(s.clone()),
                ("type", Value::String(s)) => field.field_type = Some(s.clone()),
                _ => {
                    field.extra.insert(name.clone(), v.clone());
                }
            }
        }
        Some(field)
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("key".to_string(), Value::String(self.key.clone()));
        if let Some(label) = &self.label {
            obj.insert("label".to_string(), Value::String(label.clone()));
        }
        if let Some(field_type) = &self.field_type {
            obj.insert("type".to_string(), Value::String(field_type.clone()));
        }
        for (k, v) in &self.extra {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

/// Parse a schema array, dropping elements that are not field definitions.
pub fn fields_from_value(value: &Value) -> Vec<Field> {
    value
        .as_array()
        .map(|arr| arr.iter().filter_map(Field::from_value).collect())
        .unwrap_or_default()
}

// ============================================================================
// Patch
// ============================================================================

/// Normalized description of the changes one input makes to a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub target_array_key: String,
    /// Record property used to match entries. Empty means every upserted
    /// entry is appended.
    pub entry_key_field: String,
    #[serde(default)]
    pub metadata: MetadataPatch,
    #[serde(default)]
    pub schema: SchemaPatch,
    #[serde(default)]
    pub entries: EntriesPatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(default)]
    pub set: Map<String, Value>,
    #[serde(default)]
    pub unset: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaPatch {
    #[serde(default)]
    pub upsert: Vec<Field>,
    #[serde(default)]
    pub remove_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntriesPatch {
    #[serde(default)]
    pub upsert: Vec<Value>,
    #[serde(default)]
    pub remove_keys: Vec<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }
}

impl SchemaPatch {
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove_keys.is_empty()
    }
}

impl EntriesPatch {
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove_keys.is_empty()
    }
}

impl Patch {
    /// An empty patch targeting the given keys.
    pub fn new(target_array_key: impl Into<String>, entry_key_field: impl Into<String>) -> Self {
        Self {
            target_array_key: target_array_key.into(),
            entry_key_field: entry_key_field.into(),
            ..Default::default()
        }
    }

    /// True when applying the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.schema.is_empty() && self.entries.is_empty()
    }
}

// ============================================================================
// Revision
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    Snapshot,
    Diff,
}

/// Immutable, persisted unit of change.
///
/// Field names are the persisted wire names; exactly one of `patch`/`blob`
/// is expected to be populated, matching `kind`. Use [`Revision::body`] to
/// read it; records that break the rule yield no body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: String,
    pub collection_key: String,
    pub kind: RevisionKind,
    /// RFC 3339 UTC, millisecond precision.
    pub created_at: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Patch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<Value>,
}

/// Typed view over a well-formed revision payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RevisionBody<'a> {
    Snapshot(&'a Value),
    Diff(&'a Patch),
}

impl Revision {
    pub fn snapshot(
        collection_key: impl Into<String>,
        parent_id: Option<String>,
        label: Option<String>,
        blob: Value,
    ) -> Self {
        Self {
            id: generate_revision_id(),
            collection_key: collection_key.into(),
            kind: RevisionKind::Snapshot,
            created_at: now_timestamp(),
            parent_id,
            label,
            patch: None,
            blob: Some(blob),
        }
    }

    pub fn diff(
        collection_key: impl Into<String>,
        parent_id: Option<String>,
        label: Option<String>,
        patch: Patch,
    ) -> Self {
        Self {
            id: generate_revision_id(),
            collection_key: collection_key.into(),
            kind: RevisionKind::Diff,
            created_at: now_timestamp(),
            parent_id,
            label,
            patch: Some(patch),
            blob: None,
        }
    }

    pub fn body(&self) -> Option<RevisionBody<'_>> {
        match (self.kind, &self.patch, &self.blob) {
            (RevisionKind::Snapshot, None, Some(blob)) => Some(RevisionBody::Snapshot(blob)),
            (RevisionKind::Diff, Some(patch), None) => Some(RevisionBody::Diff(patch)),
            _ => None,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.body().is_some()
    }
}

/// Fresh revision id (UUID v4).
pub fn generate_revision_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ============================================================================
// Options
// ============================================================================

/// Options for `commit_patch` / `commit_snapshot`.
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Human-readable label stored on the revision.
    pub label: Option<String>,
}

/// Options for `resolve_at_revision`.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Canonical base already fetched by the caller. When `None` the
    /// canonical source is consulted only if the chain needs a seed.
    pub base_blob: Option<Value>,
}
