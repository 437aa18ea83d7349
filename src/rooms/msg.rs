use std::collections::BTreeMap;

use sqlx::SqlitePool;
use time::{Date, Month};
use uuid::Uuid;

use crate::{db::{Message, RoomMessageGroup}, ChatResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room: String,
    pub content: String,
    pub sender: String,
    pub time: String,
    pub date: String,
}

pub(crate) async fn send_msg(db_pool: &SqlitePool, new: NewMessage) -> ChatResult<Message> {
    let NewMessage { room, content, sender, time, date } = new;
    let id = Uuid::now_v7().simple().to_string();

    sqlx::query("INSERT INTO messages (id,content,sender,time,date,room) VALUES (?,?,?,?,?,?)")
        .bind(&id)
        .bind(&content)
        .bind(&sender)
        .bind(&time)
        .bind(&date)
        .bind(&room)
        .execute(db_pool)
        .await?;

    tracing::debug!(message_id = %id, room = %room, "stored message");

    Ok(Message {
        id,
        content,
        from: sender,
        time,
        date,
        to: room,
    })
}

/// Every message sent to `room`, bucketed by date label, oldest date first.
///
/// Re-reads the store on each call. Rooms nobody wrote to (including names
/// outside the registry) yield no groups.
pub async fn room_message_groups(db_pool: &SqlitePool, room: &str) -> ChatResult<Vec<RoomMessageGroup>> {
    let rows: Vec<(String, String, String, String, String, String)> =
        sqlx::query_as("SELECT id,content,sender,time,date,room FROM messages WHERE room=? ORDER BY rowid")
            .bind(room)
            .fetch_all(db_pool)
            .await?;

    let messages = rows
        .into_iter()
        .map(|(id, content, from, time, date, to)| Message { id, content, from, time, date, to });

    Ok(group_by_date(messages))
}

/// Groups keep the incoming order of their messages. Labels naming the same
/// calendar day (`01/05/2024`, `1/5/2024`) share one group, labelled with
/// whichever spelling came first.
pub fn group_by_date(messages: impl IntoIterator<Item = Message>) -> Vec<RoomMessageGroup> {
    let mut groups: BTreeMap<DateKey, RoomMessageGroup> = BTreeMap::new();
    for message in messages {
        groups
            .entry(date_key(&message.date))
            .or_insert_with(|| RoomMessageGroup {
                date: message.date.clone(),
                messages: Vec::new(),
            })
            .messages
            .push(message);
    }

    groups.into_values().collect()
}

/// Sort key for a `MM/DD/YYYY` label. Labels that are not a real calendar
/// date sort after every valid one, by their `YYYYMMDD` text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum DateKey {
    Calendar(Date),
    Rebuilt(String),
}

pub(crate) fn date_key(label: &str) -> DateKey {
    let parts: Vec<&str> = label.split('/').collect();
    let [month, day, year] = parts[..] else {
        return DateKey::Rebuilt(label.to_owned());
    };

    match parse_calendar(month, day, year) {
        Some(date) => DateKey::Calendar(date),
        None => DateKey::Rebuilt(format!("{year}{month}{day}")),
    }
}

fn parse_calendar(month: &str, day: &str, year: &str) -> Option<Date> {
    let month = Month::try_from(month.trim().parse::<u8>().ok()?).ok()?;
    let day = day.trim().parse::<u8>().ok()?;
    let year = year.trim().parse::<i32>().ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
