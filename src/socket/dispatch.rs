use sqlx::SqlitePool;

use crate::{
    db::UserStatus,
    rooms::msg::{self, NewMessage},
    users::store,
    ChatError, ChatResult,
};

use super::{events::{ClientEvent, ServerEvent}, hub::{ConnId, Hub}};

/// Binds inbound socket events (and the logout action) to store reads,
/// writes and the emits that follow them.
#[derive(Debug, Clone)]
pub struct EventRouter {
    db_pool: SqlitePool,
    hub: Hub,
}

impl EventRouter {
    pub fn new(db_pool: SqlitePool, hub: Hub) -> Self {
        Self { db_pool, hub }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Handles one raw frame from `conn`. Never fails: bad frames are
    /// answered with an `error` event, store failures are only logged.
    pub async fn dispatch(&self, conn: ConnId, raw: &str) {
        let event = match ClientEvent::decode(raw) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(%conn, error = %err, "rejected socket frame");
                if let ChatError::Validation { event, .. } = &err {
                    self.hub.emit(conn, ServerEvent::Error {
                        event: event.clone(),
                        message: err.to_string(),
                    }).await;
                }
                return;
            }
        };

        let name = event.name();
        if let Err(err) = self.handle(conn, event).await {
            tracing::error!(%conn, event = name, error = %err, "socket handler failed");
        }
    }

    pub async fn handle(&self, conn: ConnId, event: ClientEvent) -> ChatResult<()> {
        use ClientEvent::*;
        match event {
            NewUser { user_id } => self.new_user(conn, user_id.as_deref()).await,
            JoinRoom { new_room, previous_room } => {
                self.join_room(conn, &new_room, previous_room.as_deref()).await
            }
            MessageRoom(new) => self.message_room(conn, new).await,
        }
    }

    async fn new_user(&self, conn: ConnId, user_id: Option<&str>) -> ChatResult<()> {
        // an unknown id still gets everyone the user list, just unbound
        if let Some(user_id) = user_id {
            match store::find_by_id(&self.db_pool, user_id).await? {
                Some(mut user) => {
                    user.status = UserStatus::Online;
                    store::save(&self.db_pool, &user).await?;
                    self.hub.bind_user(conn, user_id).await;
                }
                None => tracing::warn!(%conn, user_id, "new-user for unknown user"),
            }
        }

        let members = store::find_all(&self.db_pool).await?;
        self.hub.emit_all(ServerEvent::NewUser(members)).await;
        Ok(())
    }

    async fn join_room(&self, conn: ConnId, new_room: &str, previous_room: Option<&str>) -> ChatResult<()> {
        self.hub.join(conn, new_room, previous_room).await;
        tracing::info!(%conn, room = new_room, "joined room");

        let groups = msg::room_message_groups(&self.db_pool, new_room).await?;
        self.hub.emit(conn, ServerEvent::RoomMessages(groups)).await;
        Ok(())
    }

    async fn message_room(&self, conn: ConnId, new: NewMessage) -> ChatResult<()> {
        let message = msg::send_msg(&self.db_pool, new).await?;
        let room = message.to;

        let groups = msg::room_message_groups(&self.db_pool, &room).await?;
        self.hub.emit_room(&room, ServerEvent::RoomMessages(groups)).await;
        self.hub.emit_others(conn, ServerEvent::Notifications(room)).await;
        Ok(())
    }

    /// Marks `user_id` offline with the unread count its client reported,
    /// then pushes the user list to everyone but that user's connections.
    pub async fn logout(&self, user_id: &str, new_messages: i64) -> ChatResult<()> {
        let mut user = store::find_by_id(&self.db_pool, user_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(user_id.to_owned()))?;
        user.status = UserStatus::Offline;
        user.new_messages = new_messages;
        store::save(&self.db_pool, &user).await?;
        tracing::info!(user_id, new_messages, "user logged out");

        let members = store::find_all(&self.db_pool).await?;
        self.hub.emit_except_user(user_id, ServerEvent::NewUser(members)).await;
        Ok(())
    }
}
