pub mod msg;

use std::sync::Arc;

use axum::{debug_handler, extract::State, routing::get, Json, Router};

use crate::AppState;

pub const DEFAULT_ROOMS: [&str; 8] = [
    "World", "Bangalore", "Chennai", "Mumbai", "Delhi", "America", "Australia", "Goa",
];

/// Fixed set of room names, decided at startup.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    names: Arc<[String]>,
}

impl RoomRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::<String>::into).collect(),
        }
    }

    pub fn list(&self) -> &[String] {
        &self.names
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ROOMS)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_rooms(State(rooms): State<RoomRegistry>) -> Json<Vec<String>> {
    Json(rooms.list().to_vec())
}
