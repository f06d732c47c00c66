//! SQLite storage engine.
//!
//! Emulates a document store on top of SQLite using `rusqlite` for the
//! synchronous work and `tokio-rusqlite` for async wrapping:
//!
//! - a database is one file, `<data_dir>/<name>.sqlite3`
//! - a table holds `(id, doc)` rows where `doc` is the record as JSON text
//! - a secondary index is an expression index over `json_extract(doc, '$.<field>')`
//!
//! SQLite builds indexes synchronously, so an index that exists is ready.

mod connection;
mod error;
mod schema;

pub use connection::SqliteConnector;
