use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Online,
    Offline,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        use UserStatus::*;
        match self {
            Online => "Online",
            Offline => "Offline",
        }
    }

    /// Anything that isn't "Online" is treated as offline.
    pub fn from_db(value: &str) -> Self {
        if value == "Online" { UserStatus::Online } else { UserStatus::Offline }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub status: UserStatus,
    #[serde(rename = "newMessages")]
    pub new_messages: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub from: String,
    pub time: String,
    pub date: String,
    pub to: String,
}

/// Messages of one room that share a date label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMessageGroup {
    #[serde(rename = "_id")]
    pub date: String,
    #[serde(rename = "messagesByDate")]
    pub messages: Vec<Message>,
}

pub async fn init_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Online',
            new_messages INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY NOT NULL,
            content TEXT NOT NULL,
            sender TEXT NOT NULL,
            time TEXT NOT NULL,
            date TEXT NOT NULL,
            room TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS messages_room ON messages (room)")
        .execute(db_pool)
        .await?;

    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let db_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&db_pool).await.unwrap();
    db_pool
}
