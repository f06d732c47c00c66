use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Connection is closed")]
    ConnectionClosed,
    #[error("Database `{name}` does not exist")]
    DatabaseNotFound { name: String },
    #[error("Table `{name}` does not exist")]
    TableNotFound { name: String },
    #[error("Index `{index}` on table `{table}` does not exist")]
    IndexNotFound { table: String, index: String },
    #[error("{kind} `{name}` already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("Todo not found: {id}")]
    NotFound { id: String },
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// True when the error only says the target resource is already there.
    ///
    /// Provisioning treats this as success: another process got there first.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists { .. })
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
