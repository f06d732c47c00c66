//! SQLite connector and per-request connection.

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;

use todos_core::storage::{validate_name, Connection, Connector, Result, StorageError};
use todos_core::todo::{apply_patch, NewTodo, Todo, TodoPatch};

use super::error::{map_tokio_rusqlite_error, wrap_err, wrap_json, Subject};
use super::schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens SQLite-backed connections to one database file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    data_dir: PathBuf,
    database: String,
}

impl SqliteConnector {
    /// Creates a connector for database `database` under `data_dir`.
    ///
    /// Nothing is touched on disk until a connection creates the database.
    pub fn new(data_dir: impl Into<PathBuf>, database: &str) -> Result<Self> {
        validate_name(database)?;
        Ok(Self {
            data_dir: data_dir.into(),
            database: database.to_string(),
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite3", self.database))
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        let metadata = tokio::fs::metadata(&self.data_dir).await.map_err(|e| {
            StorageError::ConnectionFailed(format!(
                "data directory {} is not reachable: {e}",
                self.data_dir.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::ConnectionFailed(format!(
                "{} is not a directory",
                self.data_dir.display()
            )));
        }

        Ok(Arc::new(SqliteConnection {
            database: self.database.clone(),
            path: self.path(),
            handle: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A session on one SQLite database file.
///
/// The underlying `tokio_rusqlite::Connection` is opened lazily, the first
/// time an operation needs a database that exists on disk.
struct SqliteConnection {
    database: String,
    path: PathBuf,
    handle: Mutex<Option<tokio_rusqlite::Connection>>,
    closed: AtomicBool,
}

impl SqliteConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StorageError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    async fn file_exists(&self) -> Result<bool> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))
    }

    /// Returns the open handle, opening the database file if it exists.
    async fn handle(&self) -> Result<tokio_rusqlite::Connection> {
        self.ensure_open()?;
        let mut slot = self.handle.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        if !self.file_exists().await? {
            return Err(StorageError::DatabaseNotFound {
                name: self.database.clone(),
            });
        }

        let conn = open(&self.path).await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn exists_in_schema(&self, sql: &'static str, name: String) -> Result<bool> {
        let conn = self.handle().await?;
        let subject_name = name.clone();
        conn.call(move |conn| {
            conn.query_row(sql, [&name], |row| row.get::<_, bool>(0))
                .map_err(wrap_err)
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, Subject::table(&subject_name)))
    }

    /// Fails unless the table and its index both exist.
    async fn require_index(&self, table: &str, index: &str) -> Result<()> {
        if !self.table_exists(table).await? {
            return Err(StorageError::TableNotFound {
                name: table.to_string(),
            });
        }
        if !self.index_exists(table, index).await? {
            return Err(StorageError::IndexNotFound {
                table: table.to_string(),
                index: index.to_string(),
            });
        }
        Ok(())
    }
}

async fn open(path: &Path) -> Result<tokio_rusqlite::Connection> {
    let conn = tokio_rusqlite::Connection::open(path)
        .await
        .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

    conn.call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(wrap_err)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(wrap_err)?;
        conn.execute_batch(schema::PRAGMAS).map_err(wrap_err)?;
        Ok(())
    })
    .await
    .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

    Ok(conn)
}

#[async_trait]
impl Connection for SqliteConnection {
    fn database(&self) -> &str {
        &self.database
    }

    async fn database_exists(&self) -> Result<bool> {
        self.ensure_open()?;
        if self.handle.lock().await.is_some() {
            return Ok(true);
        }
        self.file_exists().await
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.exists_in_schema(schema::TABLE_EXISTS, table.to_string())
            .await
    }

    async fn index_exists(&self, table: &str, index: &str) -> Result<bool> {
        self.exists_in_schema(schema::INDEX_EXISTS, schema::index_name(table, index))
            .await
    }

    async fn create_database(&self) -> Result<()> {
        self.ensure_open()?;
        let mut slot = self.handle.lock().await;
        if slot.is_some() || self.file_exists().await? {
            return Err(StorageError::AlreadyExists {
                kind: "Database",
                name: self.database.clone(),
            });
        }

        let conn = open(&self.path).await?;
        tracing::debug!(
            database = %self.database,
            path = %self.path.display(),
            "Created database file"
        );
        *slot = Some(conn);
        Ok(())
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        validate_name(table)?;
        let conn = self.handle().await?;
        let sql = schema::create_table(table);
        conn.call(move |conn| {
            conn.execute(&sql, []).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, Subject::table(table)))
    }

    async fn create_index(&self, table: &str, index: &str) -> Result<()> {
        validate_name(table)?;
        validate_name(index)?;
        let conn = self.handle().await?;
        let sql = schema::create_index(table, index);
        conn.call(move |conn| {
            conn.execute(&sql, []).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, Subject::index(table, index)))
    }

    async fn wait_for_index(&self, table: &str, index: &str) -> Result<()> {
        self.require_index(table, index).await
    }

    async fn list_ordered(&self, table: &str, index: &str) -> Result<Vec<Todo>> {
        self.require_index(table, index).await?;
        let conn = self.handle().await?;
        let sql = schema::select_ordered(table, index);

        conn.call(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(wrap_err)?;

            let mut todos = Vec::new();
            for row_result in rows {
                let doc = row_result.map_err(wrap_err)?;
                todos.push(serde_json::from_str::<Todo>(&doc).map_err(wrap_json)?);
            }
            Ok(todos)
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, Subject::table(table)))
    }

    async fn insert(&self, table: &str, todo: NewTodo) -> Result<Todo> {
        let conn = self.handle().await?;
        let todo = todo.into_todo();
        let id = todo.id().unwrap_or_default().to_string();
        let doc =
            serde_json::to_string(&todo).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let sql = schema::insert(table);
        let row_id = id.clone();

        conn.call(move |conn| {
            conn.execute(&sql, params![row_id, doc]).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, Subject::record(table, &id)))?;

        Ok(todo)
    }

    async fn update(&self, table: &str, patch: TodoPatch) -> Result<Todo> {
        let conn = self.handle().await?;
        let select = schema::select_doc(table);
        let replace = schema::replace_doc(table);
        let id = patch.id.clone();

        let updated = conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let doc: Option<String> = tx
                    .query_row(&select, [&patch.id], |row| row.get(0))
                    .optional()
                    .map_err(wrap_err)?;
                let Some(doc) = doc else {
                    return Ok(None);
                };

                let existing: Todo = serde_json::from_str(&doc).map_err(wrap_json)?;
                let updated = apply_patch(&existing, &patch);
                let new_doc = serde_json::to_string(&updated).map_err(wrap_json)?;
                tx.execute(&replace, params![patch.id, new_doc])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(Some(updated))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, Subject::record(table, &id)))?;

        updated.ok_or(StorageError::NotFound { id })
    }

    async fn delete(&self, table: &str, id: &str) -> Result<u64> {
        let conn = self.handle().await?;
        let sql = schema::delete(table);
        let row_id = id.to_string();

        conn.call(move |conn| {
            let removed = conn.execute(&sql, [&row_id]).map_err(wrap_err)?;
            Ok(removed as u64)
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, Subject::record(table, id)))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let conn = self.handle.lock().await.take();
        if let Some(conn) = conn {
            conn.close()
                .await
                .map_err(|e| map_tokio_rusqlite_error(e, Subject::table(&self.database)))?;
        }
        tracing::trace!(database = %self.database, "Closed SQLite connection");
        Ok(())
    }
}
