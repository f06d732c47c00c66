//! Application state.
//!
//! Holds the connector built from the storage descriptor. Connections are
//! opened per request from it; nothing else is shared between requests.

use std::sync::Arc;

use todos_core::storage::Connector;

/// Shared application state.
///
/// Cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    /// Opens the per-request storage connections.
    pub connector: Arc<dyn Connector>,
}

impl AppState {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}
