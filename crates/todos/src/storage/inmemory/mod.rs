//! In-memory storage engine.
//!
//! Keeps databases, tables and indexes in HashMaps behind a
//! `tokio::sync::RwLock`, with the same semantics as the SQLite engine. Used
//! by the test suite and for throwaway local runs (`TODOS_ENGINE=memory`).
//!
//! The engine also records how many connections were opened and how many
//! times each one was closed, and can be told to refuse connections or to
//! fail index creation, so tests can observe the connection lifecycle and
//! the fatal provisioning paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use todos::storage::inmemory::InMemoryEngine;
//!
//! let engine = InMemoryEngine::new("todos");
//! let conn = engine.connect().await?;
//! ```

mod engine;

pub use engine::InMemoryEngine;
