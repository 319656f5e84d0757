//! Input classification for pasted JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::InferenceConfig;
use crate::infer::{detect_array_key, metadata_of};

/// What a piece of pasted input represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    /// Metadata plus a schema or a record array.
    Full,
    /// Metadata only.
    Metadata,
    /// Field definitions only.
    Schema,
    /// A bare array of records.
    Entries,
    /// An object exposing a record array, without metadata.
    EntriesObject,
    Unknown,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Full => "full",
            InputKind::Metadata => "metadata",
            InputKind::Schema => "schema",
            InputKind::Entries => "entries",
            InputKind::EntriesObject => "entries-object",
            InputKind::Unknown => "unknown",
        }
    }

    /// Kinds whose records take part in the entry diff.
    pub fn carries_entries(&self) -> bool {
        matches!(self, InputKind::Full | InputKind::Entries | InputKind::EntriesObject)
    }

    /// Kinds whose metadata takes part in the metadata diff.
    pub fn carries_metadata(&self) -> bool {
        matches!(self, InputKind::Full | InputKind::Metadata)
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `value` is an object with a non-empty string `key` and a
/// `label` or `type`.
pub fn looks_like_field(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.get("key")
        .and_then(Value::as_str)
        .is_some_and(|k| !k.is_empty())
        && (obj.contains_key("label") || obj.contains_key("type"))
}

/// Classify arbitrary input. Never fails; unrecognized shapes are `Unknown`.
pub fn classify(input: &Value, config: &InferenceConfig) -> InputKind {
    match input {
        Value::Array(items) => {
            if !items.is_empty() && items.iter().all(looks_like_field) {
                InputKind::Schema
            } else {
                InputKind::Entries
            }
        }
        Value::Object(obj) => {
            let metadata = metadata_of(input);
            let top_schema = obj.get("schema").is_some_and(Value::is_array);
            let has_records = detect_array_key(input, config).is_some();

            match metadata {
                Some(_) if top_schema || has_records => InputKind::Full,
                Some(meta)
                    if meta.len() == 1 && meta.get("schema").is_some_and(Value::is_array) =>
                {
                    InputKind::Schema
                }
                Some(_) => InputKind::Metadata,
                None if top_schema && !has_records => InputKind::Schema,
                None if has_records => InputKind::EntriesObject,
                None => InputKind::Unknown,
            }
        }
        _ => InputKind::Unknown,
    }
}
