pub mod store;

use axum::{debug_handler, extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{db::User, AppState, ChatError, ChatResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(register))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    Json(RegisterRequest { name }): Json<RegisterRequest>,
) -> ChatResult<(StatusCode, Json<User>)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::validation("register", "name must not be empty"));
    }

    let user = store::create(&db_pool, name).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_users(State(db_pool): State<SqlitePool>) -> ChatResult<Json<Vec<User>>> {
    Ok(Json(store::find_all(&db_pool).await?))
}
