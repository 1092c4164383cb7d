//! Router tests for request shapes and routing.
//!
//! The pool connects lazily and every request here is answered before the
//! database is touched, so no PostgreSQL instance is needed.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use snakeboard_engine::protocol::ErrorBody;
use snakeboard_server::{app, db, AppState};
use tower::ServiceExt;

fn test_app() -> Router {
    let pool = db::create_lazy_pool("postgres://snakeboard@localhost:5432/snakeboard").unwrap();
    app(AppState::new(pool))
}

async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[cfg(test)]
mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_ok() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["connections"], 0);
    }

    #[tokio::test]
    async fn test_root_names_the_service() {
        let (status, body) = send(get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Snakeboard Server");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, _) = send(get("/leaderboard")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[cfg(test)]
mod collection_tests {
    use super::*;

    #[tokio::test]
    async fn test_read_of_unknown_collection_is_not_found() {
        let (status, body) = send(get("/collections/todos/rows")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "unknown collection: todos");
    }

    #[tokio::test]
    async fn test_create_in_unknown_collection_is_not_found() {
        let request = json_request(
            Method::POST,
            "/collections/todos/rows",
            r#"{"playerName":"Maya","score":130}"#,
        );
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_in_unknown_collection_is_not_found() {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/collections/todos/rows/row-1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_best_write_in_unknown_collection_is_not_found() {
        let request = json_request(
            Method::POST,
            "/collections/todos/best",
            r#"{"playerName":"Maya","score":130}"#,
        );
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_player_name_is_rejected() {
        let request = json_request(
            Method::POST,
            "/collections/scores/rows",
            r#"{"playerName":"   ","score":50}"#,
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "Invalid request");
        assert!(error.details.is_some());
    }

    #[tokio::test]
    async fn test_missing_score_is_rejected() {
        let request = json_request(
            Method::POST,
            "/collections/scores/best",
            r#"{"playerName":"Maya"}"#,
        );
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_body_without_json_content_type_is_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/collections/scores/rows")
            .body(Body::from(r#"{"playerName":"Maya","score":130}"#))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_score_beyond_storage_range_is_rejected() {
        let request = json_request(
            Method::POST,
            "/collections/scores/rows",
            &format!(r#"{{"playerName":"Maya","score":{}}}"#, u64::MAX),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(error.error.contains("out of range"));
    }

    #[tokio::test]
    async fn test_unknown_order_key_is_rejected() {
        let (status, _) = send(get("/collections/scores/rows?orderBy=name")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_websocket_route_requires_upgrade() {
        let (status, _) = send(get("/ws")).await;
        assert!(status.is_client_error());
        assert_ne!(status, StatusCode::NOT_FOUND);
    }
}
