pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod logout;
pub mod rooms;
pub mod socket;
pub mod users;

use std::sync::Arc;

use axum::{extract::FromRef, routing::{delete, get}, Router};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

pub use config::Config;
pub use error::{ChatError, ChatResult};
use rooms::RoomRegistry;
use socket::EventRouter;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub rooms: RoomRegistry,
    pub events: EventRouter,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        Self {
            events: EventRouter::new(db_pool.clone(), socket::Hub::default()),
            db_pool,
            rooms: RoomRegistry::default(),
            config: Arc::new(config),
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index))
        .route("/logout", delete(logout::logout))

        .nest("/rooms", rooms::router())
        .nest("/users", users::router())
        .merge(socket::router())

        .with_state(app_state)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{db::{memory_pool, UserStatus}, users::store};

    async fn test_state() -> AppState {
        let config = Config {
            database_url: "sqlite::memory:".to_owned(),
            listen_addr: ([127, 0, 0, 1], 0).into(),
            socket_origins: vec!["http://allowed.test".to_owned()],
            db_max_connections: 1,
        };
        AppState::new(memory_pool().await, config)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> axum::body::Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn root_greets() {
        let response = app(test_state().await)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body_bytes(response).await[..], b"Hello World");
    }

    #[tokio::test]
    async fn rooms_lists_the_registry() {
        let mut state = test_state().await;
        state.rooms = RoomRegistry::new(["World", "Goa"]);

        let response = app(state)
            .oneshot(Request::builder().uri("/rooms").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let rooms: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(rooms, json!(["World", "Goa"]));
    }

    #[tokio::test]
    async fn logout_marks_user_offline() {
        let state = test_state().await;
        let user = store::create(&state.db_pool, "Asha").await.unwrap();

        let response = app(state.clone())
            .oneshot(json_request(
                Method::DELETE,
                "/logout",
                json!({ "_id": user.id, "newMessages": 5 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());

        let stored = store::find_by_id(&state.db_pool, &user.id).await.unwrap().unwrap();
        assert_eq!(stored.status, UserStatus::Offline);
        assert_eq!(stored.new_messages, 5);
    }

    #[tokio::test]
    async fn logout_failures_are_empty_bad_requests() {
        let state = test_state().await;

        for body in [
            json!({ "_id": "ghost", "newMessages": 1 }),
            json!({ "newMessages": 1 }),
            json!({ "_id": "ghost", "newMessages": "lots" }),
        ] {
            let response = app(state.clone())
                .oneshot(json_request(Method::DELETE, "/logout", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_bytes(response).await.is_empty());
        }
    }

    #[tokio::test]
    async fn users_can_register_and_be_listed() {
        let state = test_state().await;

        let response = app(state.clone())
            .oneshot(json_request(Method::POST, "/users", json!({ "name": "Asha" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(created["name"], "Asha");
        assert_eq!(created["status"], "Online");
        assert_eq!(created["newMessages"], 0);

        let response = app(state)
            .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let users: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(users[0]["_id"], created["_id"]);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let response = app(test_state().await)
            .oneshot(json_request(Method::POST, "/users", json!({ "name": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn socket_handshake_from_foreign_origin_is_refused() {
        let request = Request::builder()
            .uri("/socket")
            .header("origin", "http://evil.test")
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap();

        let response = app(test_state().await).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
