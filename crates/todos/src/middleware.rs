//! Per-request connection lifecycle.
//!
//! Applied as a route layer on the `/todo/*` API routes. Before the handler
//! runs a connection is opened and placed in the request extensions as part
//! of a [`RequestContext`]; after the handler returns, successfully or not,
//! the connection is closed.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    context::{extract_request_id, RequestContext},
    handlers::ApiError,
    state::AppState,
    storage::ConnectionLease,
};

/// Opens a connection for the request and closes it once the handler is done.
///
/// If the connection cannot be opened the handler is skipped and the request
/// fails with a 500.
pub async fn connection_lifecycle(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = extract_request_id(request.headers());

    let lease = match ConnectionLease::acquire(state.connector.as_ref()).await {
        Ok(lease) => lease,
        Err(e) => {
            tracing::debug!(
                request_id = %request_id,
                error = %e,
                "Failed to open storage connection, skipping handler"
            );
            return ApiError::from(e).into_response();
        }
    };

    request.extensions_mut().insert(RequestContext {
        request_id,
        connection: lease.connection(),
    });

    let response = next.run(request).await;
    lease.release().await;
    tracing::trace!(
        request_id = %request_id,
        status = %response.status(),
        "Released storage connection"
    );

    response
}
