use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Primary key field of every record.
pub const ID_FIELD: &str = "id";
/// Creation timestamp, stamped by the server and indexed for ordering.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Transient marker the browser client sets while a save is in flight.
pub const SAVING_FIELD: &str = "_saving";

/// Formats a timestamp the way records store it.
///
/// RFC 3339 in UTC with a fixed microsecond precision, so that comparing the
/// strings lexically gives the same order as comparing the instants.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A persisted todo record.
///
/// Apart from `id` and `createdAt` the payload is open: whatever JSON fields
/// the client sent are stored and returned untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Todo(Map<String, Value>);

impl Todo {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn created_at(&self) -> Option<&str> {
        self.0.get(CREATED_AT_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// A record about to be inserted: `createdAt` is stamped, `id` may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub id: Option<String>,
    pub fields: Map<String, Value>,
}

impl NewTodo {
    /// Materializes the record, generating a UUID v4 when the client did not
    /// supply an id.
    pub fn into_todo(self) -> Todo {
        let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut fields = self.fields;
        fields.insert(ID_FIELD.to_string(), Value::String(id));
        Todo(fields)
    }
}

/// A partial update addressed to one record.
///
/// `fields` never contains `id` or `createdAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoPatch {
    pub id: String,
    pub fields: Map<String, Value>,
}
