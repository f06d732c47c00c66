//! Storage engine implementations.
//!
//! This module provides concrete implementations of the gateway traits
//! defined in `todos_core::storage`. The engine is picked at startup from
//! [`Config::engine`](crate::config::Config).
//!
//! # Feature Flags
//!
//! - `sqlite` (default): SQLite engine using `rusqlite` and `tokio-rusqlite`
//!
//! The in-memory engine is always compiled in; tests run against it.

use std::sync::Arc;

use anyhow::Result;
use todos_core::storage::{validate_name, Connector};

use crate::config::{Config, Engine};

pub mod inmemory;
mod lease;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use lease::ConnectionLease;

/// Builds the connector described by the configuration.
pub fn connector_from_config(config: &Config) -> Result<Arc<dyn Connector>> {
    validate_name(&config.database)?;

    match config.engine {
        Engine::Memory => Ok(Arc::new(inmemory::InMemoryEngine::new(&config.database))),
        #[cfg(feature = "sqlite")]
        Engine::Sqlite => Ok(Arc::new(sqlite::SqliteConnector::new(
            &config.data_dir,
            &config.database,
        )?)),
        #[cfg(not(feature = "sqlite"))]
        Engine::Sqlite => anyhow::bail!(
            "The sqlite engine is not compiled in; rebuild with --features sqlite"
        ),
    }
}
