use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{
    db::{self, non_blank, Message, Sender},
    events, users, AppError, AppResult, AppState, During,
};

use super::Hub;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    pub text: Option<String>,
}

impl NewMessage {
    pub fn new(event_id: Uuid, user_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            event_id: Some(event_id.to_string()),
            user_id: Some(user_id.to_string()),
            text: Some(text.into()),
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_message(
    State(db_pool): State<SqlitePool>,
    State(hub): State<Hub>,
    payload: Result<Json<NewMessage>, JsonRejection>,
) -> AppResult<Json<Message>> {
    let Json(new_message) = payload?;
    let message = post_message(&db_pool, &hub, new_message)
        .await
        .during("create message")?;
    Ok(Json(message))
}

/// The one write path for messages, shared by HTTP and the room socket.
///
/// Stores the message, hands it to `hub` and returns it with the sender's
/// name filled in.
pub async fn post_message(
    db_pool: &SqlitePool,
    hub: &Hub,
    NewMessage { event_id, user_id, text }: NewMessage,
) -> AppResult<Message> {
    let (Some(event_id), Some(user_id), Some(text)) =
        (non_blank(event_id), non_blank(user_id), non_blank(text))
    else {
        return Err(AppError::validation("Missing eventId, userId or text"));
    };

    let event_id = parse_id("eventId", &event_id)?;
    let user_id = parse_id("userId", &user_id)?;

    if !events::exists(db_pool, event_id).await? {
        return Err(AppError::validation(format!("Unknown event {event_id}")));
    }
    let Some(sender_name) = users::name_of(db_pool, user_id).await? else {
        return Err(AppError::validation(format!("Unknown user {user_id}")));
    };

    let id = Uuid::now_v7();
    let created_at = db::to_millis(OffsetDateTime::now_utc());
    sqlx::query("INSERT INTO messages (id,text,sender_id,event_id,created_at) VALUES (?,?,?,?,?)")
        .bind(id.to_string())
        .bind(&text)
        .bind(user_id.to_string())
        .bind(event_id.to_string())
        .bind(created_at)
        .execute(db_pool)
        .await?;

    let message = Message {
        id,
        text,
        sender: Sender { id: user_id, name: sender_name },
        event: event_id,
        created_at: db::from_millis(created_at)?,
    };
    debug!(%id, event = %event_id, "stored message");

    hub.publish(message.clone());
    Ok(message)
}

fn parse_id(field: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::validation(format!("Invalid {field} {value}")))
}
