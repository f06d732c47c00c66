//! Partial-update merge for todo records.
//!
//! Nested objects are merged key by key; every other value (including arrays
//! and `null`) replaces what was stored. `id` and `createdAt` are never
//! touched by a patch.

use serde_json::{Map, Value};

use super::types::{Todo, TodoPatch, CREATED_AT_FIELD, ID_FIELD};

/// Applies `patch` on top of `existing` and returns the updated record.
pub fn apply_patch(existing: &Todo, patch: &TodoPatch) -> Todo {
    let mut fields = existing.fields().clone();

    for (key, value) in &patch.fields {
        if key == ID_FIELD || key == CREATED_AT_FIELD {
            continue;
        }
        merge_value(&mut fields, key, value);
    }

    Todo::from_fields(fields)
}

fn merge_value(target: &mut Map<String, Value>, key: &str, value: &Value) {
    match (target.get_mut(key), value) {
        (Some(Value::Object(current)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                merge_value(current, k, v);
            }
        }
        _ => {
            target.insert(key.to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn todo(value: Value) -> Todo {
        serde_json::from_value(value).unwrap()
    }

    fn patch(id: &str, value: Value) -> TodoPatch {
        match value {
            Value::Object(fields) => TodoPatch {
                id: id.to_string(),
                fields,
            },
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_replaces_top_level_fields() {
        let existing = todo(json!({"id": "abc", "createdAt": "t0", "title": "old", "done": false}));
        let updated = apply_patch(&existing, &patch("abc", json!({"title": "new"})));

        assert_eq!(updated.get("title"), Some(&json!("new")));
        assert_eq!(updated.get("done"), Some(&json!(false)));
        assert_eq!(updated.id(), Some("abc"));
        assert_eq!(updated.created_at(), Some("t0"));
    }

    #[test]
    fn test_merges_nested_objects() {
        let existing = todo(json!({"id": "abc", "meta": {"color": "red", "tags": ["a"]}}));
        let updated = apply_patch(
            &existing,
            &patch("abc", json!({"meta": {"tags": ["b"], "pinned": true}})),
        );

        assert_eq!(
            updated.get("meta"),
            Some(&json!({"color": "red", "tags": ["b"], "pinned": true}))
        );
    }

    #[test]
    fn test_never_overwrites_identity_fields() {
        let existing = todo(json!({"id": "abc", "createdAt": "t0"}));
        let updated = apply_patch(
            &existing,
            &patch("abc", json!({"id": "zzz", "createdAt": "t9"})),
        );

        assert_eq!(updated.id(), Some("abc"));
        assert_eq!(updated.created_at(), Some("t0"));
    }

    #[test]
    fn test_null_replaces_value() {
        let existing = todo(json!({"id": "abc", "note": "x"}));
        let updated = apply_patch(&existing, &patch("abc", json!({"note": null})));

        assert_eq!(updated.get("note"), Some(&Value::Null));
    }
}
