use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db::{User, UserStatus}, ChatResult};

type UserRow = (String, String, String, i64);

fn from_row((id, name, status, new_messages): UserRow) -> User {
    User {
        id,
        name,
        status: UserStatus::from_db(&status),
        new_messages,
    }
}

pub async fn find_by_id(db_pool: &SqlitePool, id: &str) -> ChatResult<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id,name,status,new_messages FROM users WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?;

    Ok(row.map(from_row))
}

pub async fn find_all(db_pool: &SqlitePool) -> ChatResult<Vec<User>> {
    let rows: Vec<UserRow> =
        sqlx::query_as("SELECT id,name,status,new_messages FROM users ORDER BY rowid")
            .fetch_all(db_pool)
            .await?;

    Ok(rows.into_iter().map(from_row).collect())
}

/// Writes back every mutable field of an existing user.
pub async fn save(db_pool: &SqlitePool, user: &User) -> ChatResult<()> {
    sqlx::query("UPDATE users SET name=?,status=?,new_messages=? WHERE id=?")
        .bind(&user.name)
        .bind(user.status.as_str())
        .bind(user.new_messages)
        .bind(&user.id)
        .execute(db_pool)
        .await?;

    Ok(())
}

pub async fn create(db_pool: &SqlitePool, name: &str) -> ChatResult<User> {
    let user = User {
        id: Uuid::now_v7().simple().to_string(),
        name: name.to_owned(),
        status: UserStatus::Online,
        new_messages: 0,
    };

    sqlx::query("INSERT INTO users (id,name,status,new_messages) VALUES (?,?,?,?)")
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.status.as_str())
        .bind(user.new_messages)
        .execute(db_pool)
        .await?;

    tracing::info!(user_id = %user.id, name = %user.name, "registered user");
    Ok(user)
}
