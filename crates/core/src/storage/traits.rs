use std::sync::Arc;

use async_trait::async_trait;

use crate::todo::{NewTodo, Todo, TodoPatch};

use super::Result;

/// Opens sessions against a storage engine.
///
/// One connector is built at startup from the storage descriptor and shared
/// by every request.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection bound to the configured database.
    ///
    /// Succeeds as long as the engine is reachable, even if the database
    /// itself has not been created yet.
    async fn connect(&self) -> Result<Arc<dyn Connection>>;
}

/// One live session to the storage engine.
///
/// A connection belongs to a single request (or to the provisioning
/// sequence) and is closed exactly once when its owner is done with it.
/// Every operation on a closed connection fails with
/// [`StorageError::ConnectionClosed`](super::StorageError::ConnectionClosed).
#[async_trait]
pub trait Connection: Send + Sync {
    /// Name of the database this connection is bound to.
    fn database(&self) -> &str;

    /// Checks whether the bound database exists.
    async fn database_exists(&self) -> Result<bool>;

    /// Checks whether a table exists in the bound database.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Checks whether a secondary index exists on a table.
    async fn index_exists(&self, table: &str, index: &str) -> Result<bool>;

    /// Creates the bound database.
    async fn create_database(&self) -> Result<()>;

    /// Creates a table.
    async fn create_table(&self, table: &str) -> Result<()>;

    /// Creates a secondary index over the record field named `index`.
    async fn create_index(&self, table: &str, index: &str) -> Result<()>;

    /// Resolves once the index is ready to serve ordered reads.
    ///
    /// Fails when the database, the table or the index is missing.
    async fn wait_for_index(&self, table: &str, index: &str) -> Result<()>;

    /// Reads every record of a table ordered by `index`, ascending.
    async fn list_ordered(&self, table: &str, index: &str) -> Result<Vec<Todo>>;

    /// Inserts a record and returns it as stored.
    async fn insert(&self, table: &str, todo: NewTodo) -> Result<Todo>;

    /// Applies a partial update and returns the record after the update.
    async fn update(&self, table: &str, patch: TodoPatch) -> Result<Todo>;

    /// Deletes a record by id and returns how many records were removed.
    async fn delete(&self, table: &str, id: &str) -> Result<u64>;

    /// Closes the session. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}
