use std::{path::Path, time::Duration};

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    handlers::{
        health::{livez, readyz},
        todos::{create_todo, delete_todo, list_todos, update_todo},
    },
    middleware::connection_lifecycle,
    state::AppState,
};

/// Create the application router with all routes and middleware.
///
/// Only the `/todo/*` routes get a storage connection. Anything that matches
/// no route is served from `public_dir`.
pub fn create_app(state: AppState, public_dir: impl AsRef<Path>, timeout: Duration) -> Router {
    // API routes, one storage connection per request
    let api_routes = Router::new()
        .route("/todo/get", get(list_todos))
        .route("/todo/new", put(create_todo))
        .route("/todo/update", post(update_todo))
        .route("/todo/delete", post(delete_todo))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            connection_lifecycle,
        ));

    // Main application router
    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .merge(api_routes)
        .fallback_service(ServeDir::new(public_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use todos_core::storage::{Connector, CREATED_AT_INDEX, TODOS_TABLE};
    use todos_core::todo::NewTodo;

    use crate::storage::inmemory::InMemoryEngine;

    async fn provisioned_engine() -> InMemoryEngine {
        let engine = InMemoryEngine::new("test");
        let conn = engine.connect().await.unwrap();
        conn.create_database().await.unwrap();
        conn.create_table(TODOS_TABLE).await.unwrap();
        conn.create_index(TODOS_TABLE, CREATED_AT_INDEX).await.unwrap();
        conn.close().await.unwrap();
        engine
    }

    fn app_for(engine: &InMemoryEngine, public_dir: &Path) -> Router {
        let state = AppState::new(Arc::new(engine.clone()));
        create_app(state, public_dir, Duration::from_secs(10))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn body_text(response: Response) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_list_empty() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app.oneshot(get_request("/todo/get")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_create_round_trip() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/todo/new", json!({"title": "buy milk"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap();
        assert!(!id.is_empty());
        assert!(created["createdAt"].is_string());
        assert_eq!(created["title"], "buy milk");

        let response = app.oneshot(get_request("/todo/get")).await.unwrap();
        assert_eq!(body_json(response).await, json!([created]));
    }

    #[tokio::test]
    async fn test_create_overrides_client_created_at() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .oneshot(json_request(
                "PUT",
                "/todo/new",
                json!({"id": "mine", "createdAt": "1970-01-01T00:00:00.000000Z"}),
            ))
            .await
            .unwrap();

        let created = body_json(response).await;
        assert_eq!(created["id"], "mine");
        assert_ne!(created["createdAt"], "1970-01-01T00:00:00.000000Z");
    }

    #[tokio::test]
    async fn test_create_duplicate_id_is_500() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        for expected in [StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR] {
            let response = app
                .clone()
                .oneshot(json_request("PUT", "/todo/new", json!({"id": "abc"})))
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_created_at() {
        let engine = provisioned_engine().await;
        let conn = engine.connect().await.unwrap();
        for (id, created_at) in [
            ("second", "2024-01-02T00:00:00.000000Z"),
            ("third", "2024-01-03T00:00:00.000000Z"),
            ("first", "2024-01-01T00:00:00.000000Z"),
        ] {
            let mut fields = serde_json::Map::new();
            fields.insert("createdAt".to_string(), json!(created_at));
            conn.insert(
                TODOS_TABLE,
                NewTodo {
                    id: Some(id.to_string()),
                    fields,
                },
            )
            .await
            .unwrap();
        }
        conn.close().await.unwrap();

        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());
        let response = app.oneshot(get_request("/todo/get")).await.unwrap();

        let ids: Vec<String> = body_json(response)
            .await
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_update_without_id_is_500_and_mutates_nothing() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/todo/new", json!({"title": "keep"})))
            .await
            .unwrap();
        let created = body_json(response).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/todo/update",
                json!({"title": "changed", "_saving": true}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "The todo must have a field id.");

        let response = app.oneshot(get_request("/todo/get")).await.unwrap();
        assert_eq!(body_json(response).await, json!([created]));
    }

    #[tokio::test]
    async fn test_update_with_id() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/todo/new",
                json!({"title": "buy milk", "completed": false}),
            ))
            .await
            .unwrap();
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap();

        let response = app
            .oneshot(json_request(
                "POST",
                "/todo/update",
                json!({"id": id, "completed": true, "_saving": true}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["id"], id);
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["title"], "buy milk");
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert!(updated.get("_saving").is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_500() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .oneshot(json_request("POST", "/todo/update", json!({"id": "ghost"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Todo not found: ghost");
    }

    #[tokio::test]
    async fn test_delete_then_list() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/todo/new", json!({"title": "gone soon"})))
            .await
            .unwrap();
        let created = body_json(response).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/todo/delete",
                json!({"id": created["id"]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());

        let response = app.oneshot(get_request("/todo/get")).await.unwrap();
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_succeeds() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .oneshot(json_request("POST", "/todo/delete", json!({"id": "ghost"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_without_id_is_500() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .oneshot(json_request("POST", "/todo/delete", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "The todo must have a field id");
    }

    #[tokio::test]
    async fn test_malformed_body_is_500() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/todo/new")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_body_is_500() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app
            .oneshot(json_request("PUT", "/todo/new", json!([1, 2, 3])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "The todo must be a JSON object");
    }

    #[tokio::test]
    async fn test_oversized_body_is_500_and_closes_connection() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());
        let title = "x".repeat(3 * 1024 * 1024);

        let response = app
            .oneshot(json_request("PUT", "/todo/new", json!({"title": title})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_text(response).await.is_empty());
        assert_eq!(engine.close_counts(), vec![1, 1]);

        let conn = engine.connect().await.unwrap();
        let todos = conn
            .list_ordered(TODOS_TABLE, CREATED_AT_INDEX)
            .await
            .unwrap();
        assert!(todos.is_empty());
    }

    #[tokio::test]
    async fn test_every_request_closes_its_connection_once() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());
        let before = engine.opened();

        let requests = vec![
            get_request("/todo/get"),
            json_request("PUT", "/todo/new", json!({"title": "a"})),
            json_request("POST", "/todo/update", json!({})),
            json_request("POST", "/todo/delete", json!({"id": "ghost"})),
        ];
        for request in requests {
            app.clone().oneshot(request).await.unwrap();
        }

        assert_eq!(engine.opened() - before, 4);
        // The provisioning connection plus one per request, each closed once.
        assert_eq!(engine.close_counts(), vec![1; 5]);
    }

    #[tokio::test]
    async fn test_connect_failure_is_500_and_skips_handler() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());
        engine.refuse_connections(true);

        let response = app
            .oneshot(json_request("PUT", "/todo/new", json!({"title": "lost"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            "Connection failed: in-memory engine is refusing connections"
        );

        engine.refuse_connections(false);
        let conn = engine.connect().await.unwrap();
        let todos = conn
            .list_ordered(TODOS_TABLE, CREATED_AT_INDEX)
            .await
            .unwrap();
        assert!(todos.is_empty());
    }

    #[tokio::test]
    async fn test_liveness_and_readiness() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app.clone().oneshot(get_request("/livez")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_request("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"ready": true}));
    }

    #[tokio::test]
    async fn test_readiness_fails_before_provisioning() {
        let engine = InMemoryEngine::new("test");
        let dir = TempDir::new().unwrap();
        let app = app_for(&engine, dir.path());

        let response = app.oneshot(get_request("/readyz")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["ready"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_static_files_served_from_public_dir() {
        let engine = provisioned_engine().await;
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Todos</h1>").unwrap();
        let app = app_for(&engine, dir.path());
        let before = engine.opened();

        let response = app.clone().oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>Todos</h1>");

        let response = app.oneshot(get_request("/missing.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        assert_eq!(engine.opened(), before);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_crud_round_trip_over_sqlite() {
        use crate::provision::provision;
        use crate::storage::sqlite::SqliteConnector;
        use todos_core::provision::ProvisionTarget;

        let data_dir = TempDir::new().unwrap();
        let public_dir = TempDir::new().unwrap();
        let connector = SqliteConnector::new(data_dir.path(), "app").unwrap();
        provision(&connector, &ProvisionTarget::default())
            .await
            .unwrap();
        let state = AppState::new(Arc::new(connector));
        let app = create_app(state, public_dir.path(), Duration::from_secs(10));

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/todo/new",
                json!({"id": "a", "title": "first", "completed": false}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["id"], "a");
        assert!(created["createdAt"].is_string());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/todo/update",
                json!({"id": "a", "completed": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["title"], "first");
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let response = app
            .clone()
            .oneshot(get_request("/todo/get"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([updated]));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/todo/delete", json!({"id": "a"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_request("/todo/get")).await.unwrap();
        assert_eq!(body_json(response).await, json!([]));
    }
}
