//! In-memory engine implementation.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use todos_core::storage::{validate_name, Connection, Connector, Result, StorageError};
use todos_core::todo::{apply_patch, NewTodo, Todo, TodoPatch};

#[derive(Debug, Default)]
struct Table {
    rows: HashMap<String, Todo>,
    indexes: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Database {
    tables: BTreeMap<String, Table>,
}

#[derive(Debug, Default)]
struct Catalog {
    databases: BTreeMap<String, Database>,
}

impl Catalog {
    fn database(&self, name: &str) -> Result<&Database> {
        self.databases
            .get(name)
            .ok_or_else(|| StorageError::DatabaseNotFound {
                name: name.to_string(),
            })
    }

    fn database_mut(&mut self, name: &str) -> Result<&mut Database> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| StorageError::DatabaseNotFound {
                name: name.to_string(),
            })
    }

    fn table(&self, database: &str, table: &str) -> Result<&Table> {
        self.database(database)?
            .tables
            .get(table)
            .ok_or_else(|| StorageError::TableNotFound {
                name: table.to_string(),
            })
    }

    fn table_mut(&mut self, database: &str, table: &str) -> Result<&mut Table> {
        self.database_mut(database)?
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound {
                name: table.to_string(),
            })
    }

    fn indexed_table(&self, database: &str, table: &str, index: &str) -> Result<&Table> {
        let found = self.table(database, table)?;
        if found.indexes.contains(index) {
            Ok(found)
        } else {
            Err(StorageError::IndexNotFound {
                table: table.to_string(),
                index: index.to_string(),
            })
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    refuse_connections: AtomicBool,
    fail_index_creation: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    catalog: RwLock<Catalog>,
    faults: Faults,
    next_connection: AtomicU64,
    /// Close calls per connection id, including no-op repeats.
    closes: Mutex<BTreeMap<u64, u32>>,
}

/// In-memory storage engine.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Debug, Clone)]
pub struct InMemoryEngine {
    database: String,
    inner: Arc<Inner>,
}

impl InMemoryEngine {
    /// Creates an empty engine whose connections bind to `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            inner: Arc::new(Inner::default()),
        }
    }
}

// Fault injection and introspection hooks for tests.
#[cfg_attr(not(test), allow(dead_code))]
impl InMemoryEngine {
    /// Makes every subsequent `connect` fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.inner
            .faults
            .refuse_connections
            .store(refuse, Ordering::SeqCst);
    }

    /// Makes every subsequent `create_index` fail.
    pub fn fail_index_creation(&self, fail: bool) {
        self.inner
            .faults
            .fail_index_creation
            .store(fail, Ordering::SeqCst);
    }

    /// Number of connections opened so far.
    pub fn opened(&self) -> u64 {
        self.inner.next_connection.load(Ordering::SeqCst)
    }

    /// How many times each connection had `close` called, in opening order.
    ///
    /// Connections never closed do not appear.
    pub fn close_counts(&self) -> Vec<u32> {
        self.inner
            .closes
            .lock()
            .map(|closes| closes.values().copied().collect())
            .unwrap_or_default()
    }

    /// Names of every database.
    pub async fn database_names(&self) -> Vec<String> {
        let catalog = self.inner.catalog.read().await;
        catalog.databases.keys().cloned().collect()
    }

    /// Names of every table in a database.
    pub async fn table_names(&self, database: &str) -> Vec<String> {
        let catalog = self.inner.catalog.read().await;
        catalog
            .database(database)
            .map(|db| db.tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of every index on a table.
    pub async fn index_names(&self, database: &str, table: &str) -> Vec<String> {
        let catalog = self.inner.catalog.read().await;
        catalog
            .table(database, table)
            .map(|t| t.indexes.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for InMemoryEngine {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        if self.inner.faults.refuse_connections.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed(
                "in-memory engine is refusing connections".to_string(),
            ));
        }

        let id = self.inner.next_connection.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(connection = id, database = %self.database, "Opened in-memory connection");

        Ok(Arc::new(InMemoryConnection {
            id,
            database: self.database.clone(),
            inner: Arc::clone(&self.inner),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A session on the in-memory engine.
struct InMemoryConnection {
    id: u64,
    database: String,
    inner: Arc<Inner>,
    closed: AtomicBool,
}

impl InMemoryConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StorageError::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Connection for InMemoryConnection {
    fn database(&self) -> &str {
        &self.database
    }

    async fn database_exists(&self) -> Result<bool> {
        self.ensure_open()?;
        let catalog = self.inner.catalog.read().await;
        Ok(catalog.databases.contains_key(&self.database))
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.ensure_open()?;
        let catalog = self.inner.catalog.read().await;
        Ok(catalog.database(&self.database)?.tables.contains_key(table))
    }

    async fn index_exists(&self, table: &str, index: &str) -> Result<bool> {
        self.ensure_open()?;
        let catalog = self.inner.catalog.read().await;
        Ok(catalog.table(&self.database, table)?.indexes.contains(index))
    }

    async fn create_database(&self) -> Result<()> {
        self.ensure_open()?;
        validate_name(&self.database)?;
        let mut catalog = self.inner.catalog.write().await;
        if catalog.databases.contains_key(&self.database) {
            return Err(StorageError::AlreadyExists {
                kind: "Database",
                name: self.database.clone(),
            });
        }
        catalog
            .databases
            .insert(self.database.clone(), Database::default());
        Ok(())
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        self.ensure_open()?;
        validate_name(table)?;
        let mut catalog = self.inner.catalog.write().await;
        let db = catalog.database_mut(&self.database)?;
        if db.tables.contains_key(table) {
            return Err(StorageError::AlreadyExists {
                kind: "Table",
                name: table.to_string(),
            });
        }
        db.tables.insert(table.to_string(), Table::default());
        Ok(())
    }

    async fn create_index(&self, table: &str, index: &str) -> Result<()> {
        self.ensure_open()?;
        validate_name(index)?;
        if self.inner.faults.fail_index_creation.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed(format!(
                "index `{index}` could not be built"
            )));
        }

        let mut catalog = self.inner.catalog.write().await;
        let found = catalog.table_mut(&self.database, table)?;
        if !found.indexes.insert(index.to_string()) {
            return Err(StorageError::AlreadyExists {
                kind: "Index",
                name: index.to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for_index(&self, table: &str, index: &str) -> Result<()> {
        self.ensure_open()?;
        let catalog = self.inner.catalog.read().await;
        catalog.indexed_table(&self.database, table, index)?;
        Ok(())
    }

    async fn list_ordered(&self, table: &str, index: &str) -> Result<Vec<Todo>> {
        self.ensure_open()?;
        let catalog = self.inner.catalog.read().await;
        let found = catalog.indexed_table(&self.database, table, index)?;

        let mut todos: Vec<Todo> = found.rows.values().cloned().collect();
        todos.sort_by(|a, b| {
            compare_values(a.get(index), b.get(index)).then_with(|| a.id().cmp(&b.id()))
        });
        Ok(todos)
    }

    async fn insert(&self, table: &str, todo: NewTodo) -> Result<Todo> {
        self.ensure_open()?;
        let todo = todo.into_todo();
        let id = todo.id().unwrap_or_default().to_string();

        let mut catalog = self.inner.catalog.write().await;
        let found = catalog.table_mut(&self.database, table)?;
        if found.rows.contains_key(&id) {
            return Err(StorageError::AlreadyExists {
                kind: "Todo",
                name: id,
            });
        }
        found.rows.insert(id, todo.clone());
        Ok(todo)
    }

    async fn update(&self, table: &str, patch: TodoPatch) -> Result<Todo> {
        self.ensure_open()?;
        let mut catalog = self.inner.catalog.write().await;
        let found = catalog.table_mut(&self.database, table)?;

        let existing = found
            .rows
            .get(&patch.id)
            .ok_or_else(|| StorageError::NotFound {
                id: patch.id.clone(),
            })?;
        let updated = apply_patch(existing, &patch);
        found.rows.insert(patch.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<u64> {
        self.ensure_open()?;
        let mut catalog = self.inner.catalog.write().await;
        let found = catalog.table_mut(&self.database, table)?;
        Ok(u64::from(found.rows.remove(id).is_some()))
    }

    async fn close(&self) -> Result<()> {
        if let Ok(mut closes) = self.inner.closes.lock() {
            *closes.entry(self.id).or_insert(0) += 1;
        }
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::trace!(connection = self.id, "Closed in-memory connection");
        }
        Ok(())
    }
}

/// Orders index values the way SQLite orders `json_extract` results:
/// missing/null, then numbers, then strings, then everything else.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) | Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (
            Some(x @ (Value::Number(_) | Value::Bool(_))),
            Some(y @ (Value::Number(_) | Value::Bool(_))),
        ) => numeric(x).total_cmp(&numeric(y)),
        (Some(x), Some(y)) if rank(a) == 3 && rank(b) == 3 => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn numeric(value: &Value) -> f64 {
    match value {
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        _ => 0.0,
    }
}
