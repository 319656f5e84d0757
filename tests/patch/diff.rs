use less_rev::classify::InputKind;
use less_rev::patch::changeset::Changeset;
use less_rev::patch::diff::{compute_patch, DiffOptions, PatchWarning};
use less_rev::types::Field;
use serde_json::{json, Value};

// ============================================================================
// Helpers
// ============================================================================

fn fields(names: &[&str]) -> Changeset {
    names.iter().map(|n| n.to_string()).collect()
}

fn partial() -> DiffOptions {
    DiffOptions::default()
}

fn base_vocab() -> Value {
    json!({
        "metadata": {
            "name": "Vocab",
            "entry_key": "id",
            "schema": [
                {"key": "id", "label": "ID", "type": "string"},
                {"key": "val", "label": "Value", "type": "string"}
            ]
        },
        "entries": [
            {"id": "k1", "val": "a", "note": "first"},
            {"id": "k2", "val": "b"}
        ]
    })
}

// ============================================================================
// Entries
// ============================================================================

#[test]
fn bare_array_edits_one_and_adds_one() {
    let base = json!({"metadata": {"entry_key": "id"}, "entries": [{"id": "k1", "val": "a"}]});
    let input = json!([{"id": "k1", "val": "b"}, {"id": "k2", "val": "c"}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.kind, InputKind::Entries);
    assert_eq!(result.patch.target_array_key, "entries");
    assert_eq!(result.patch.entry_key_field, "id");
    assert_eq!(
        result.patch.entries.upsert,
        vec![json!({"id": "k1", "val": "b"}), json!({"id": "k2", "val": "c"})]
    );
    assert!(result.patch.entries.remove_keys.is_empty());
    assert!(result.patch.metadata.is_empty());
    assert!(result.patch.schema.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.summary.entries_added, 1);
    assert_eq!(result.summary.entries_updated, 1);
}

#[test]
fn unchanged_matched_entries_produce_nothing() {
    let base = base_vocab();
    let input = json!([{"id": "k1", "val": "a"}, {"id": "k2", "val": "b"}]);

    let result = compute_patch(&base, &input, &partial());

    assert!(result.patch.is_empty());
    assert!(result.summary.is_empty());
    assert_eq!(result.summary.to_string(), "no changes");
}

#[test]
fn edited_entry_stores_full_incoming_record() {
    let base = base_vocab();
    let input = json!([{"id": "k1", "val": "z", "note": "first"}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(
        result.patch.entries.upsert,
        vec![json!({"id": "k1", "val": "z", "note": "first"})]
    );
    assert_eq!(result.upsert_minimal, vec![json!({"id": "k1", "val": "z"})]);
    assert_eq!(result.entry_changes.len(), 1);
    assert_eq!(result.entry_changes[0].key, "k1");
    assert_eq!(result.entry_changes[0].fields, fields(&["val"]));
}

#[test]
fn new_entry_appears_in_full_in_minimal_view() {
    let base = base_vocab();
    let input = json!([{"id": "k9", "val": "new", "extra": true}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.upsert_minimal, vec![json!({"id": "k9", "val": "new", "extra": true})]);
    assert!(result.entry_changes.is_empty());
}

#[test]
fn omitted_fields_are_not_changes() {
    let base = base_vocab();
    // `note` is missing from the input; shallow merge keeps it.
    let input = json!([{"id": "k1", "val": "a"}]);

    let result = compute_patch(&base, &input, &partial());

    assert!(result.patch.entries.is_empty());
}

#[test]
fn numerically_equal_values_are_unchanged() {
    let base = json!({"entries": [{"id": "a", "score": 1}]});
    let input = json!([{"id": "a", "score": 1.0}]);

    let result = compute_patch(&base, &input, &partial());

    assert!(result.patch.entries.is_empty());
}

#[test]
fn explicit_null_differs_from_missing_field() {
    let base = json!({"entries": [{"id": "a"}]});
    let input = json!([{"id": "a", "note": null}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.entries.upsert, vec![json!({"id": "a", "note": null})]);
    assert_eq!(result.entry_changes[0].fields, fields(&["note"]));
}

#[test]
fn partial_updates_never_remove_entries() {
    let base = base_vocab();
    let input = json!({"entries": [{"id": "k1", "val": "a"}]});

    let result = compute_patch(&base, &input, &DiffOptions::replace());

    assert_eq!(result.kind, InputKind::EntriesObject);
    assert!(result.patch.entries.remove_keys.is_empty());
}

#[test]
fn entries_object_uses_its_own_array_key() {
    let base = json!({"metadata": {"entry_key": "id"}, "entries": []});
    let input = json!({"items": [{"id": "x", "v": 1}]});

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.target_array_key, "items");
    assert_eq!(result.patch.entries.upsert, vec![json!({"id": "x", "v": 1})]);
}

#[test]
fn entry_key_inferred_from_input_records() {
    let base = json!({"cards": [{"word": "hola", "meaning": "hello"}]});
    let input = json!([{"word": "hola", "meaning": "hi"}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.target_array_key, "cards");
    assert_eq!(result.patch.entry_key_field, "word");
    assert_eq!(result.summary.entries_updated, 1);
}

#[test]
fn explicit_base_entry_key_beats_input_sampling() {
    let base = json!({"metadata": {"entry_key": "code"}, "entries": [{"code": "c1", "id": "x"}]});
    let input = json!([{"code": "c1", "id": "y"}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.entry_key_field, "code");
    assert_eq!(result.summary.entries_updated, 1);
    assert_eq!(result.summary.entries_added, 0);
}

#[test]
fn missing_entry_key_appends_and_warns() {
    let base = json!({"entries": [{"n": 1}]});
    let input = json!([{"n": 1}, {"n": 2}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.entry_key_field, "");
    assert_eq!(result.patch.entries.upsert, vec![json!({"n": 2})]);
    assert!(result.warnings.contains(&PatchWarning::MissingEntryKey {
        array_key: "entries".to_string()
    }));
}

#[test]
fn anonymous_records_are_appended_even_with_entry_key() {
    let base = base_vocab();
    let input = json!([{"val": "no id"}, {"id": "", "val": "empty id"}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.entries.upsert.len(), 2);
    assert_eq!(result.summary.entries_added, 2);
}

#[test]
fn non_object_elements_are_ignored_with_warning() {
    let base = base_vocab();
    let input = json!([{"id": "k3", "val": "c"}, 42, "text"]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.entries.upsert, vec![json!({"id": "k3", "val": "c"})]);
    assert!(result
        .warnings
        .contains(&PatchWarning::NonObjectEntries { count: 2 }));
}

// ============================================================================
// Full replace
// ============================================================================

#[test]
fn full_replace_removes_absent_entries() {
    let base = base_vocab();
    let input = json!({
        "metadata": base["metadata"].clone(),
        "entries": [{"id": "k2", "val": "b"}]
    });

    let result = compute_patch(&base, &input, &DiffOptions::replace());

    assert_eq!(result.kind, InputKind::Full);
    assert_eq!(result.patch.entries.remove_keys, vec!["k1".to_string()]);
    assert!(result.patch.entries.upsert.is_empty());
    assert_eq!(result.summary.entries_removed, 1);
}

#[test]
fn full_without_replace_semantics_keeps_absent_entries() {
    let base = base_vocab();
    let input = json!({
        "metadata": base["metadata"].clone(),
        "entries": [{"id": "k2", "val": "b"}]
    });

    let result = compute_patch(&base, &input, &partial());

    assert!(result.patch.entries.remove_keys.is_empty());
}

#[test]
fn full_replace_without_record_array_leaves_entries_alone() {
    let base = base_vocab();
    let input = json!({
        "metadata": {"name": "Vocab", "entry_key": "id"},
        "schema": [{"key": "id", "label": "ID"}]
    });

    let result = compute_patch(&base, &input, &DiffOptions::replace());

    assert_eq!(result.kind, InputKind::Full);
    assert!(result.patch.entries.is_empty());
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn metadata_set_and_unset() {
    let base = json!({"metadata": {"name": "Old", "lang": "es", "version": 2}, "entries": []});
    let input = json!({"metadata": {"name": "New", "version": 2, "author": "me"}});

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.kind, InputKind::Metadata);
    let set = &result.patch.metadata.set;
    assert_eq!(set.get("name"), Some(&json!("New")));
    assert_eq!(set.get("author"), Some(&json!("me")));
    assert!(!set.contains_key("version"));
    assert_eq!(result.patch.metadata.unset, vec!["lang".to_string()]);
    assert!(result.patch.entries.is_empty());
}

#[test]
fn metadata_nested_objects_compare_ignoring_key_order() {
    let base = json!({"metadata": {"name": "x", "style": {"a": 1, "b": [1, 2]}}});
    let input = json!({"metadata": {"style": {"b": [1, 2], "a": 1}, "name": "x"}});

    let result = compute_patch(&base, &input, &partial());

    assert!(result.patch.metadata.is_empty());
}

#[test]
fn metadata_arrays_compare_in_order() {
    let base = json!({"metadata": {"tags": [1, 2]}});
    let input = json!({"metadata": {"tags": [2, 1]}});

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.patch.metadata.set.get("tags"), Some(&json!([2, 1])));
}

// ============================================================================
// Schema
// ============================================================================

#[test]
fn schema_array_input_adds_changes_and_removes() {
    let base = base_vocab();
    let input = json!([
        {"key": "id", "label": "ID", "type": "string"},
        {"key": "val", "label": "Meaning", "type": "string"},
        {"key": "tags", "label": "Tags", "type": "list"}
    ]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.kind, InputKind::Schema);
    assert_eq!(
        result.patch.schema.upsert,
        vec![
            Field::new("val").with_label("Meaning").with_type("string"),
            Field::new("tags").with_label("Tags").with_type("list"),
        ]
    );
    assert!(result.patch.schema.remove_keys.is_empty());
    assert_eq!(result.summary.schema_added, 1);
    assert_eq!(result.summary.schema_changed, 1);
    assert!(result.patch.entries.is_empty());
}

#[test]
fn schema_object_input_removes_missing_fields() {
    let base = base_vocab();
    let input = json!({"schema": [{"key": "id", "label": "ID", "type": "string"}]});

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.kind, InputKind::Schema);
    assert!(result.patch.schema.upsert.is_empty());
    assert_eq!(result.patch.schema.remove_keys, vec!["val".to_string()]);
}

#[test]
fn metadata_input_does_not_unset_schema() {
    let base = base_vocab();
    let input = json!({"metadata": {"name": "Vocab", "entry_key": "id"}});

    let result = compute_patch(&base, &input, &partial());

    assert!(!result.patch.metadata.unset.contains(&"schema".to_string()));
    assert!(result.patch.schema.is_empty());
}

// ============================================================================
// Unknown & purity
// ============================================================================

#[test]
fn keyless_field_definitions_do_not_wipe_the_schema() {
    let base = base_vocab();
    let input = json!([{"key": "", "label": "x"}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.kind, InputKind::Entries);
    assert!(result.patch.schema.is_empty());
}

#[test]
fn unknown_input_warns_and_is_empty() {
    let base = base_vocab();
    for input in [json!("just text"), json!(12), json!({"foo": "bar"}), Value::Null] {
        let result = compute_patch(&base, &input, &partial());
        assert_eq!(result.kind, InputKind::Unknown);
        assert!(result.patch.is_empty());
        assert_eq!(result.warnings, vec![PatchWarning::UnrecognizedInput]);
    }
}

#[test]
fn same_inputs_give_equal_patches() {
    let base = base_vocab();
    let input = json!({
        "metadata": {"name": "Renamed", "entry_key": "id"},
        "entries": [{"id": "k3", "val": "c"}, {"id": "k1", "val": "q"}]
    });

    let a = compute_patch(&base, &input, &DiffOptions::replace());
    let b = compute_patch(&base, &input, &DiffOptions::replace());

    assert_eq!(a, b);
}

#[test]
fn diffing_a_collection_against_itself_is_a_no_op() {
    let base = base_vocab();

    let result = compute_patch(&base, &base, &DiffOptions::replace());

    assert_eq!(result.kind, InputKind::Full);
    assert!(result.patch.metadata.set.is_empty());
    assert!(result.patch.metadata.unset.is_empty());
    assert!(result.patch.schema.upsert.is_empty());
    assert!(result.patch.schema.remove_keys.is_empty());
    assert!(result.patch.entries.upsert.is_empty());
    assert!(result.patch.entries.remove_keys.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn keyless_rows_matching_the_base_are_not_re_added() {
    let base = json!({
        "metadata": {"entry_key": "id"},
        "entries": [{"id": "k1", "val": "a"}, {"val": "anon"}]
    });

    let result = compute_patch(&base, &base, &partial());

    assert!(result.patch.is_empty(), "{:?}", result.patch);
    assert!(result.summary.is_empty());
}

#[test]
fn keyless_rows_match_once_each() {
    let base = json!({"metadata": {"entry_key": "id"}, "entries": [{"val": "anon"}]});
    let input = json!([{"val": "anon"}, {"val": "anon"}, {"val": "other"}]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(
        result.patch.entries.upsert,
        vec![json!({"val": "anon"}), json!({"val": "other"})]
    );
    assert_eq!(result.summary.entries_added, 2);
}

#[test]
fn changed_fields_union_over_updated_entries() {
    let base = base_vocab();
    let input = json!([
        {"id": "k1", "val": "z"},
        {"id": "k2", "val": "b", "note": "new"}
    ]);

    let result = compute_patch(&base, &input, &partial());

    assert_eq!(result.changed_fields, fields(&["note", "val"]));
    assert!(result.touches_field("note"));
    assert!(!result.touches_field("id"));
}

#[test]
fn summary_display_lists_counts() {
    let base = base_vocab();
    let input = json!([{"id": "k1", "val": "z"}, {"id": "k5", "val": "e"}]);

    let result = compute_patch(&base, &input, &partial());

    let text = result.summary.to_string();
    assert!(text.contains("entries: 1 added, 1 updated, 0 removed"), "{text}");
}
