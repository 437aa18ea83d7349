pub mod dispatch;
pub mod events;
pub mod hub;

use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket}, State, WebSocketUpgrade},
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};

use crate::{config::Config, AppState};

pub use dispatch::EventRouter;
pub use hub::{ConnId, Hub};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/socket", get(socket_ws))
}

#[debug_handler(state = AppState)]
pub(crate) async fn socket_ws(
    State(events): State<EventRouter>,
    State(config): State<Arc<Config>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    // browsers always send Origin; other clients may not
    if let Some(origin) = headers.get(ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !config.allows_origin(origin) {
            tracing::warn!(origin, "refused socket handshake");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    ws.on_upgrade(move |stream| serve_socket(events, stream))
}

async fn serve_socket(events: EventRouter, stream: WebSocket) {
    let hub = events.hub().clone();
    let (conn, mut rx) = hub.connect().await;
    tracing::info!(%conn, "socket connected");

    let (mut sender, mut receiver) = stream.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.encode() {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%conn, event = event.name(), error = %err, "failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // frames from one connection are handled one at a time, in order
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => events.dispatch(conn, text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    hub.disconnect(conn).await;
    tracing::info!(%conn, "socket disconnected");
}
