//! SQLite error mapping.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` to `StorageError` from
//! `todos_core::storage`. SQLite reports missing and duplicate schema objects
//! only through the message text, so those are matched on the message.

use todos_core::storage::StorageError;

/// What the failing statement was working on.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub kind: &'static str,
    pub table: &'a str,
    pub name: &'a str,
}

impl<'a> Subject<'a> {
    pub fn table(table: &'a str) -> Self {
        Self {
            kind: "Table",
            table,
            name: table,
        }
    }

    pub fn index(table: &'a str, index: &'a str) -> Self {
        Self {
            kind: "Index",
            table,
            name: index,
        }
    }

    pub fn record(table: &'a str, id: &'a str) -> Self {
        Self {
            kind: "Todo",
            table,
            name: id,
        }
    }
}

/// Maps a rusqlite error to a StorageError.
///
/// # Error Mapping
///
/// - `SQLITE_CONSTRAINT_PRIMARYKEY` / `SQLITE_CONSTRAINT_UNIQUE` → `AlreadyExists`
/// - `no such table` → `TableNotFound`
/// - `... already exists` → `AlreadyExists`
///
/// The last two arrive as `SqliteFailure` when raised while stepping and as
/// `SqlInputError` when raised while preparing the statement.
/// - `SQLITE_CANTOPEN` → `ConnectionFailed`
/// - All other errors → `QueryFailed`
fn map_rusqlite_error(err: &rusqlite::Error, subject: Subject<'_>) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::AlreadyExists {
                kind: subject.kind,
                name: subject.name.to_string(),
            }
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::CannotOpen =>
        {
            StorageError::ConnectionFailed(format!("Cannot open database: {err}"))
        }

        rusqlite::Error::SqliteFailure(_, Some(message)) if message.contains("no such table") => {
            StorageError::TableNotFound {
                name: subject.table.to_string(),
            }
        }

        rusqlite::Error::SqliteFailure(_, Some(message)) if message.contains("already exists") => {
            StorageError::AlreadyExists {
                kind: subject.kind,
                name: subject.name.to_string(),
            }
        }

        rusqlite::Error::SqlInputError { msg, .. } if msg.contains("no such table") => {
            StorageError::TableNotFound {
                name: subject.table.to_string(),
            }
        }

        rusqlite::Error::SqlInputError { msg, .. } if msg.contains("already exists") => {
            StorageError::AlreadyExists {
                kind: subject.kind,
                name: subject.name.to_string(),
            }
        }

        _ => StorageError::QueryFailed(err.to_string()),
    }
}

/// Maps a tokio_rusqlite error to a StorageError.
///
/// This is the entry point for error mapping in async code. Serialization
/// failures raised inside `call` closures travel as `Error::Other`.
pub fn map_tokio_rusqlite_error(err: tokio_rusqlite::Error, subject: Subject<'_>) -> StorageError {
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => map_rusqlite_error(rusqlite_err, subject),
        tokio_rusqlite::Error::ConnectionClosed => StorageError::ConnectionClosed,
        tokio_rusqlite::Error::Close(_) => {
            StorageError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        tokio_rusqlite::Error::Other(inner) if inner.is::<serde_json::Error>() => {
            StorageError::Serialization(inner.to_string())
        }
        _ => StorageError::QueryFailed(err.to_string()),
    }
}

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
pub fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Helper to wrap serde_json errors for tokio_rusqlite closures.
pub fn wrap_json(e: serde_json::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(e))
}
