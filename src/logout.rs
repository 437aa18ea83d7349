use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{socket::EventRouter, AppState, ChatError, ChatResult};

#[derive(Debug, Deserialize)]
pub(crate) struct LogoutRequest {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "newMessages")]
    new_messages: i64,
}

/// The answer does not wait on who received the refreshed user list.
#[debug_handler(state = AppState)]
pub(crate) async fn logout(
    State(events): State<EventRouter>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> ChatResult<StatusCode> {
    let Json(LogoutRequest { id, new_messages }) =
        payload.map_err(|err| ChatError::validation("logout", err.body_text()))?;

    events.logout(&id, new_messages).await?;
    Ok(StatusCode::OK)
}
