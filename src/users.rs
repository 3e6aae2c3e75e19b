use std::collections::HashMap;

use axum::{debug_handler, extract::{rejection::JsonRejection, State}, routing::get, Json, Router};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{db::{non_blank, User}, events, AppError, AppResult, AppState, During};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl NewUser {
    /// A throwaway identity for one visit to a chat room. Names may collide.
    pub fn anonymous() -> Self {
        Self {
            name: Some(format!("Anon {}", rand::rng().random_range(0..1000))),
            ..Default::default()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_users(
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<User>>> {
    let users = list(&db_pool)
        .await
        .during("fetch users")?;
    Ok(Json(users))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_user(
    State(db_pool): State<SqlitePool>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Json(new_user) = payload?;
    let user = create(&db_pool, new_user)
        .await
        .during("create user")?;
    Ok(Json(user))
}

pub async fn list(db_pool: &SqlitePool) -> AppResult<Vec<User>> {
    let rows: Vec<(String, String, Option<String>)> =
        sqlx::query_as("SELECT id,name,bio FROM users ORDER BY rowid")
            .fetch_all(db_pool)
            .await?;

    let links: Vec<(String, String)> =
        sqlx::query_as("SELECT user_id,event_id FROM user_events ORDER BY user_id,position")
            .fetch_all(db_pool)
            .await?;

    let mut events: HashMap<String, Vec<Uuid>> = HashMap::new();
    for (user_id, event_id) in links {
        events.entry(user_id).or_default().push(Uuid::parse_str(&event_id)?);
    }

    rows.into_iter()
        .map(|(id, name, bio)| -> AppResult<User> {
            Ok(User {
                id: Uuid::parse_str(&id)?,
                events: events.remove(&id).unwrap_or_default(),
                name,
                bio,
            })
        })
        .collect()
}

pub async fn create(
    db_pool: &SqlitePool,
    NewUser { name, bio, events: event_refs }: NewUser,
) -> AppResult<User> {
    let Some(name) = non_blank(name) else {
        return Err(AppError::validation("User name is required"));
    };
    let bio = non_blank(bio);

    let mut event_ids = Vec::with_capacity(event_refs.len());
    for event in &event_refs {
        let Ok(event_id) = Uuid::parse_str(event) else {
            return Err(AppError::validation(format!("Invalid event id {event}")));
        };
        if !events::exists(db_pool, event_id).await? {
            return Err(AppError::validation(format!("Unknown event {event_id}")));
        }
        event_ids.push(event_id);
    }

    let id = Uuid::now_v7();
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO users (id,name,bio) VALUES (?,?,?)")
        .bind(id.to_string())
        .bind(&name)
        .bind(&bio)
        .execute(&mut *tx)
        .await?;
    for (position, event_id) in event_ids.iter().enumerate() {
        sqlx::query("INSERT INTO user_events (user_id,event_id,position) VALUES (?,?,?)")
            .bind(id.to_string())
            .bind(event_id.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!(%id, "created user {name}");
    Ok(User { id, name, bio, events: event_ids })
}

/// The user's display name, or `None` if there is no such user.
pub async fn name_of(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<String>> {
    let name: Option<(String,)> = sqlx::query_as("SELECT name FROM users WHERE id=?")
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await?;
    Ok(name.map(|(name,)| name))
}
