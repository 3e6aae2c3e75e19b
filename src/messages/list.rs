use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::UnknownEventMessages,
    db::{Message, MessageRow},
    events, AppError, AppResult, AppState, During, StoreOptions,
};

const LIST_FOR_EVENT: &str = "SELECT m.id,m.text,m.sender_id,u.name,m.event_id,m.created_at \
    FROM messages m JOIN users u ON u.id = m.sender_id \
    WHERE m.event_id=? ORDER BY m.created_at ASC, m.id ASC";

#[debug_handler(state = AppState)]
pub(crate) async fn list_messages(
    State(db_pool): State<SqlitePool>,
    State(store): State<StoreOptions>,
    Path(event_id): Path<String>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = list_for_event(&db_pool, &event_id, store.unknown_event_messages)
        .await
        .during("fetch messages")?;
    Ok(Json(messages))
}

/// Messages of one event, oldest first, senders joined in.
///
/// `event_id` is taken raw: a malformed id is just another unknown event.
pub async fn list_for_event(
    db_pool: &SqlitePool,
    event_id: &str,
    unknown: UnknownEventMessages,
) -> AppResult<Vec<Message>> {
    let event_id = match Uuid::parse_str(event_id) {
        Ok(id) => id,
        Err(_) => return no_such_event(event_id, unknown),
    };

    if unknown == UnknownEventMessages::NotFound && !events::exists(db_pool, event_id).await? {
        return no_such_event(&event_id.to_string(), unknown);
    }

    sqlx::query_as::<_, MessageRow>(LIST_FOR_EVENT)
        .bind(event_id.to_string())
        .fetch_all(db_pool)
        .await?
        .into_iter()
        .map(Message::from_row)
        .collect()
}

fn no_such_event(event_id: &str, unknown: UnknownEventMessages) -> AppResult<Vec<Message>> {
    match unknown {
        UnknownEventMessages::Empty => Ok(Vec::new()),
        UnknownEventMessages::NotFound => Err(AppError::NotFound(format!("No event {event_id}"))),
    }
}
