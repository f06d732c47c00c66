//! Todo CRUD handlers.
//!
//! Each handler works on the connection the middleware opened for its
//! request, taken from the `RequestContext`. Bodies are parsed as JSON
//! whatever their `Content-Type`, and a body that cannot be read at all
//! fails like any other parse error.

use axum::{body::Bytes, extract::rejection::BytesRejection, http::StatusCode, Json};
use chrono::Utc;

use todos_core::storage::{CREATED_AT_INDEX, TODOS_TABLE};
use todos_core::todo::{parse_body, prepare_delete, prepare_new, prepare_update, Todo};

use crate::{context::RequestContext, handlers::ApiError};

/// List every todo, oldest first (GET /todo/get).
pub async fn list_todos(ctx: RequestContext) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = ctx
        .connection
        .list_ordered(TODOS_TABLE, CREATED_AT_INDEX)
        .await?;

    tracing::debug!(request_id = %ctx.request_id, count = todos.len(), "Listed todos");
    Ok(Json(todos))
}

/// Create a todo (PUT /todo/new).
pub async fn create_todo(
    ctx: RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Todo>, ApiError> {
    let body = body?;
    let new = prepare_new(parse_body(&body)?, Utc::now())?;
    let todo = ctx.connection.insert(TODOS_TABLE, new).await?;

    tracing::info!(
        request_id = %ctx.request_id,
        id = todo.id().unwrap_or_default(),
        "Created todo"
    );
    Ok(Json(todo))
}

/// Apply a partial update to a todo (POST /todo/update).
pub async fn update_todo(
    ctx: RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Todo>, ApiError> {
    let body = body?;
    let patch = prepare_update(parse_body(&body)?)?;
    let id = patch.id.clone();
    let todo = ctx.connection.update(TODOS_TABLE, patch).await?;

    tracing::info!(request_id = %ctx.request_id, id = %id, "Updated todo");
    Ok(Json(todo))
}

/// Delete a todo (POST /todo/delete).
///
/// Deleting an id that does not exist still succeeds.
pub async fn delete_todo(
    ctx: RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    let body = body?;
    let id = prepare_delete(parse_body(&body)?)?;
    let removed = ctx.connection.delete(TODOS_TABLE, &id).await?;

    tracing::info!(request_id = %ctx.request_id, id = %id, removed, "Deleted todo");
    Ok(StatusCode::OK)
}
