use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::AppResult;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    date INTEGER
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    bio TEXT
);

CREATE TABLE IF NOT EXISTS user_events (
    user_id TEXT NOT NULL REFERENCES users(id),
    event_id TEXT NOT NULL REFERENCES events(id),
    position INTEGER NOT NULL,
    PRIMARY KEY (user_id, position)
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    sender_id TEXT NOT NULL REFERENCES users(id),
    event_id TEXT NOT NULL REFERENCES events(id),
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_event ON messages(event_id, created_at, id);
"#;

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    info!("Connecting to {database_url}");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await?;

    init_schema(&db_pool).await?;
    Ok(db_pool)
}

/// Single-connection in-memory store. Every connection to `sqlite::memory:`
/// is its own database, so the one connection is never let go.
pub async fn memory() -> anyhow::Result<SqlitePool> {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    init_schema(&db_pool).await?;
    Ok(db_pool)
}

async fn init_schema(db_pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::raw_sql(SCHEMA).execute(db_pool).await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub events: Vec<Uuid>,
}

/// The slice of a [`User`] a message carries around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub event: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub(crate) type EventRow = (String, String, Option<String>, Option<i64>);
pub(crate) type MessageRow = (String, String, String, String, String, i64);

impl Event {
    pub(crate) fn from_row((id, name, description, date): EventRow) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::parse_str(&id)?,
            name,
            description,
            date: date.map(from_millis).transpose()?,
        })
    }
}

impl Message {
    pub(crate) fn from_row(
        (id, text, sender_id, sender_name, event_id, created_at): MessageRow,
    ) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::parse_str(&id)?,
            text,
            sender: Sender {
                id: Uuid::parse_str(&sender_id)?,
                name: sender_name,
            },
            event: Uuid::parse_str(&event_id)?,
            created_at: from_millis(created_at)?,
        })
    }
}

pub(crate) fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_millis(millis: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
}

/// Drops strings that are empty or only whitespace. Kept strings are stored as given.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip_truncates_to_the_millisecond() {
        let at = OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789).unwrap();
        let back = from_millis(to_millis(at)).unwrap();
        assert_eq!(back.unix_timestamp_nanos(), 1_700_000_000_123_000_000);
    }

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(Some(" hi ".into())), Some(" hi ".to_owned()));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn message_serializes_with_populated_sender() {
        let message = Message {
            id: Uuid::now_v7(),
            text: "hi".into(),
            sender: Sender { id: Uuid::now_v7(), name: "Anon 42".into() },
            event: Uuid::now_v7(),
            created_at: from_millis(0).unwrap(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["sender"]["name"], "Anon 42");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
    }
}
