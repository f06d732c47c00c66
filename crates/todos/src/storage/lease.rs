//! Scoped ownership of one storage connection.

use std::sync::Arc;

use todos_core::storage::{Connection, Connector, Result};

/// Owns a connection from acquisition until release.
///
/// [`release`](Self::release) closes the connection. If the lease is dropped
/// without being released (the request future was cancelled, say by the
/// timeout layer), the close is spawned onto the current runtime instead, so
/// every acquired connection is closed exactly once.
pub struct ConnectionLease {
    conn: Arc<dyn Connection>,
    released: bool,
}

impl ConnectionLease {
    /// Opens a new connection through `connector`.
    pub async fn acquire(connector: &dyn Connector) -> Result<Self> {
        let conn = connector.connect().await?;
        Ok(Self {
            conn,
            released: false,
        })
    }

    /// A shared handle to the leased connection.
    pub fn connection(&self) -> Arc<dyn Connection> {
        Arc::clone(&self.conn)
    }

    /// Closes the connection.
    pub async fn release(mut self) {
        self.released = true;
        close(Arc::clone(&self.conn)).await;
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let conn = Arc::clone(&self.conn);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!(
                    database = %conn.database(),
                    "Lease dropped, closing connection in background"
                );
                runtime.spawn(close(conn));
            }
            Err(_) => {
                tracing::warn!(
                    database = %conn.database(),
                    "Lease dropped outside a runtime, connection left to the engine"
                );
            }
        }
    }
}

async fn close(conn: Arc<dyn Connection>) {
    if let Err(e) = conn.close().await {
        tracing::warn!(
            database = %conn.database(),
            error = %e,
            "Failed to close storage connection"
        );
    }
}
