//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/readyz` - Readiness probe (opens a connection and checks the index)

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use todos_core::storage::{StorageError, CREATED_AT_INDEX, TODOS_TABLE};

use crate::{state::AppState, storage::ConnectionLease};

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /livez - Basic liveness probe.
///
/// Returns 200 immediately. Does not touch storage.
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /readyz - Readiness probe.
///
/// Opens a fresh connection and checks that the `createdAt` index is ready.
/// Returns 200 when it is, 503 with the error otherwise.
pub async fn readyz(State(state): State<AppState>) -> Response {
    match check_index(&state).await {
        Ok(()) => (
            StatusCode::OK,
            Json(Readiness {
                ready: true,
                error: None,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    ready: false,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn check_index(state: &AppState) -> Result<(), StorageError> {
    let lease = ConnectionLease::acquire(state.connector.as_ref()).await?;
    let result = lease
        .connection()
        .wait_for_index(TODOS_TABLE, CREATED_AT_INDEX)
        .await;
    lease.release().await;
    result
}
