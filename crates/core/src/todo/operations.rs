//! Request-body preparation for the CRUD handlers.
//!
//! Pure functions: bytes in, a validated storage input out.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::error::TodoError;
use super::types::{format_timestamp, NewTodo, TodoPatch, CREATED_AT_FIELD, ID_FIELD, SAVING_FIELD};

/// Parses a request body as a JSON object.
///
/// An empty body reads as `{}` and a literal `null` as `None`. Anything that
/// is neither an object nor `null` is rejected.
pub fn parse_body(body: &[u8]) -> Result<Option<Map<String, Value>>, TodoError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Some(Map::new()));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(Some(fields)),
        Ok(Value::Null) => Ok(None),
        Ok(_) => Err(TodoError::NotAnObject),
        Err(e) => Err(TodoError::Malformed(e.to_string())),
    }
}

/// Prepares a body for insertion, stamping `createdAt` with `now`.
///
/// A `createdAt` sent by the client is overwritten.
pub fn prepare_new(
    body: Option<Map<String, Value>>,
    now: DateTime<Utc>,
) -> Result<NewTodo, TodoError> {
    let mut fields = body.ok_or(TodoError::NotAnObject)?;

    let id = take_id(&mut fields)?;
    fields.insert(
        CREATED_AT_FIELD.to_string(),
        Value::String(format_timestamp(now)),
    );

    Ok(NewTodo { id, fields })
}

/// Prepares a body for a partial update.
///
/// Drops the client's `_saving` marker and any `createdAt`; the record id is
/// mandatory.
pub fn prepare_update(body: Option<Map<String, Value>>) -> Result<TodoPatch, TodoError> {
    let mut fields = body.ok_or(TodoError::MissingUpdateId)?;
    fields.remove(SAVING_FIELD);

    let id = take_id(&mut fields)?.ok_or(TodoError::MissingUpdateId)?;
    fields.remove(CREATED_AT_FIELD);

    Ok(TodoPatch { id, fields })
}

/// Extracts the id of the record to delete.
pub fn prepare_delete(body: Option<Map<String, Value>>) -> Result<String, TodoError> {
    let mut fields = body.ok_or(TodoError::MissingDeleteId)?;
    take_id(&mut fields)?.ok_or(TodoError::MissingDeleteId)
}

/// Removes `id` from the fields. `null` counts as absent.
fn take_id(fields: &mut Map<String, Value>) -> Result<Option<String>, TodoError> {
    match fields.remove(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if !id.is_empty() => Ok(Some(id)),
        Some(_) => Err(TodoError::InvalidId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn object(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_parse_body_empty_is_empty_object() {
        assert_eq!(parse_body(b"").unwrap(), Some(Map::new()));
        assert_eq!(parse_body(b"  \n").unwrap(), Some(Map::new()));
    }

    #[test]
    fn test_parse_body_null_is_none() {
        assert_eq!(parse_body(b"null").unwrap(), None);
    }

    #[test]
    fn test_parse_body_rejects_arrays() {
        assert_eq!(parse_body(b"[1, 2]"), Err(TodoError::NotAnObject));
    }

    #[test]
    fn test_parse_body_malformed_json() {
        let err = parse_body(b"{\"title\":").unwrap_err();
        assert!(matches!(err, TodoError::Malformed(_)));
    }

    #[test]
    fn test_prepare_new_stamps_created_at() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let new = prepare_new(
            object(json!({"title": "buy milk", "createdAt": "yesterday"})),
            now,
        )
        .unwrap();

        assert_eq!(new.id, None);
        assert_eq!(new.fields["title"], json!("buy milk"));
        assert_eq!(
            new.fields[CREATED_AT_FIELD],
            json!("2024-03-01T12:00:00.000000Z")
        );
    }

    #[test]
    fn test_prepare_new_keeps_client_id() {
        let new = prepare_new(object(json!({"id": "abc"})), Utc::now()).unwrap();
        assert_eq!(new.id.as_deref(), Some("abc"));
        assert!(!new.fields.contains_key(ID_FIELD));
    }

    #[test]
    fn test_prepare_new_rejects_null_body() {
        assert_eq!(prepare_new(None, Utc::now()), Err(TodoError::NotAnObject));
    }

    #[test]
    fn test_prepare_update_requires_id() {
        assert_eq!(
            prepare_update(object(json!({"title": "x"}))),
            Err(TodoError::MissingUpdateId)
        );
        assert_eq!(
            prepare_update(object(json!({"id": null}))),
            Err(TodoError::MissingUpdateId)
        );
        assert_eq!(prepare_update(None), Err(TodoError::MissingUpdateId));
    }

    #[test]
    fn test_prepare_update_strips_saving_and_created_at() {
        let patch = prepare_update(object(json!({
            "id": "abc",
            "title": "new",
            "_saving": true,
            "createdAt": "2020-01-01T00:00:00.000000Z"
        })))
        .unwrap();

        assert_eq!(patch.id, "abc");
        assert_eq!(patch.fields.len(), 1);
        assert_eq!(patch.fields["title"], json!("new"));
    }

    #[test]
    fn test_prepare_update_rejects_numeric_id() {
        assert_eq!(
            prepare_update(object(json!({"id": 7}))),
            Err(TodoError::InvalidId)
        );
    }

    #[test]
    fn test_prepare_delete() {
        assert_eq!(
            prepare_delete(object(json!({"id": "abc", "title": "x"}))).unwrap(),
            "abc"
        );
        assert_eq!(
            prepare_delete(object(json!({}))),
            Err(TodoError::MissingDeleteId)
        );
    }
}
