use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{db::{RoomMessageGroup, User}, rooms::msg::NewMessage, ChatError, ChatResult};

pub const NEW_USER: &str = "new-user";
pub const JOIN_ROOM: &str = "join-room";
pub const MESSAGE_ROOM: &str = "message-room";
pub const ROOM_MESSAGES: &str = "room-messages";
pub const NOTIFICATIONS: &str = "notifications";
pub const ERROR: &str = "error";

/// One text frame on the socket: an event name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketFrame {
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

pub trait GetArg {
    fn get_str_arg(&self, event: &str, idx: usize, name: &str) -> ChatResult<String>;
    fn get_opt_str_arg(&self, event: &str, idx: usize, name: &str) -> ChatResult<Option<String>>;
}

impl GetArg for [Value] {
    fn get_str_arg(&self, event: &str, idx: usize, name: &str) -> ChatResult<String> {
        self.get_opt_str_arg(event, idx, name)?
            .ok_or_else(|| ChatError::validation(event, format!("expected {name} at argument {idx}")))
    }

    // absent, null and "" all mean "not given"
    fn get_opt_str_arg(&self, event: &str, idx: usize, name: &str) -> ChatResult<Option<String>> {
        match self.get(idx) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ChatError::validation(
                event,
                format!("expected {name} at argument {idx} to be a string, got {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Ask for the user list to be re-broadcast, optionally announcing who
    /// this connection belongs to.
    NewUser { user_id: Option<String> },
    JoinRoom { new_room: String, previous_room: Option<String> },
    MessageRoom(NewMessage),
}

impl ClientEvent {
    pub fn decode(raw: &str) -> ChatResult<Self> {
        let frame: SocketFrame = serde_json::from_str(raw)
            .map_err(|err| ChatError::validation("frame", err.to_string()))?;
        Self::from_frame(frame)
    }

    pub fn from_frame(SocketFrame { event, args }: SocketFrame) -> ChatResult<Self> {
        match event.as_str() {
            NEW_USER => Ok(ClientEvent::NewUser {
                user_id: args.get_opt_str_arg(NEW_USER, 0, "userId")?,
            }),
            JOIN_ROOM => Ok(ClientEvent::JoinRoom {
                new_room: args.get_str_arg(JOIN_ROOM, 0, "newRoom")?,
                previous_room: args.get_opt_str_arg(JOIN_ROOM, 1, "previousRoom")?,
            }),
            MESSAGE_ROOM => Ok(ClientEvent::MessageRoom(NewMessage {
                room: args.get_str_arg(MESSAGE_ROOM, 0, "room")?,
                content: args.get_str_arg(MESSAGE_ROOM, 1, "content")?,
                sender: args.get_str_arg(MESSAGE_ROOM, 2, "sender")?,
                time: args.get_str_arg(MESSAGE_ROOM, 3, "time")?,
                date: args.get_str_arg(MESSAGE_ROOM, 4, "date")?,
            })),
            _ => Err(ChatError::validation(event.as_str(), "unknown event")),
        }
    }

    pub fn name(&self) -> &'static str {
        use ClientEvent::*;
        match self {
            NewUser { .. } => NEW_USER,
            JoinRoom { .. } => JOIN_ROOM,
            MessageRoom(_) => MESSAGE_ROOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    NewUser(Vec<User>),
    RoomMessages(Vec<RoomMessageGroup>),
    /// Name of a room that received a message.
    Notifications(String),
    Error { event: String, message: String },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        use ServerEvent::*;
        match self {
            NewUser(_) => NEW_USER,
            RoomMessages(_) => ROOM_MESSAGES,
            Notifications(_) => NOTIFICATIONS,
            Error { .. } => ERROR,
        }
    }

    pub fn to_frame(&self) -> serde_json::Result<SocketFrame> {
        use ServerEvent::*;
        let arg = match self {
            NewUser(users) => serde_json::to_value(users)?,
            RoomMessages(groups) => serde_json::to_value(groups)?,
            Notifications(room) => Value::String(room.clone()),
            Error { event, message } => json!({ "event": event, "message": message }),
        };

        Ok(SocketFrame {
            event: self.name().to_owned(),
            args: vec![arg],
        })
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_frame()?)
    }
}
