use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::UndatedEvents,
    db::{self, non_blank, Event, EventRow},
    AppError, AppResult, AppState, During, StoreOptions,
};

const LIST_UNDATED_LAST: &str =
    "SELECT id,name,description,date FROM events ORDER BY date IS NULL ASC, date DESC, id DESC";
const LIST_UNDATED_FIRST: &str =
    "SELECT id,name,description,date FROM events ORDER BY date IS NULL DESC, date DESC, id DESC";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        serialize_with = "time::serde::rfc3339::option::serialize",
        deserialize_with = "date_input::deserialize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<OffsetDateTime>,
}

/// Event dates as clients send them: RFC 3339, an ISO date-time without an
/// offset, a bare ISO date, or unix milliseconds. No offset means UTC.
pub(crate) mod date_input {
    use std::fmt;

    use serde::{de, Deserializer};
    use time::{
        format_description::well_known::Rfc3339, macros::format_description, Date,
        OffsetDateTime, PrimitiveDateTime,
    };

    use crate::db;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(MaybeDate)
    }

    pub fn parse(value: &str) -> Result<OffsetDateTime, String> {
        let value = value.trim();
        if let Ok(at) = OffsetDateTime::parse(value, &Rfc3339) {
            return Ok(at);
        }

        let local = format_description!(
            version = 2,
            "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
        );
        if let Ok(at) = PrimitiveDateTime::parse(value, local) {
            return Ok(at.assume_utc());
        }

        Date::parse(value, format_description!("[year]-[month]-[day]"))
            .map(|date| date.midnight().assume_utc())
            .map_err(|_| format!("unrecognised date `{value}`"))
    }

    struct MaybeDate;

    impl<'de> de::Visitor<'de> for MaybeDate {
        type Value = Option<OffsetDateTime>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a date string, unix milliseconds or null")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(DateValue).map(Some)
        }
    }

    struct DateValue;

    impl de::Visitor<'_> for DateValue {
        type Value = OffsetDateTime;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a date string or unix milliseconds")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            parse(value).map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, millis: i64) -> Result<Self::Value, E> {
            db::from_millis(millis).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, millis: u64) -> Result<Self::Value, E> {
            let millis = i64::try_from(millis).map_err(E::custom)?;
            self.visit_i64(millis)
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_events(
    State(db_pool): State<SqlitePool>,
    State(store): State<StoreOptions>,
) -> AppResult<Json<Vec<Event>>> {
    let events = list(&db_pool, store.undated_events)
        .await
        .during("fetch events")?;
    Ok(Json(events))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_event(
    State(db_pool): State<SqlitePool>,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> AppResult<Json<Event>> {
    let Json(new_event) = payload?;
    let event = create(&db_pool, new_event)
        .await
        .during("create event")?;
    Ok(Json(event))
}

pub async fn list(db_pool: &SqlitePool, undated: UndatedEvents) -> AppResult<Vec<Event>> {
    let sql = match undated {
        UndatedEvents::Last => LIST_UNDATED_LAST,
        UndatedEvents::First => LIST_UNDATED_FIRST,
    };

    sqlx::query_as::<_, EventRow>(sql)
        .fetch_all(db_pool)
        .await?
        .into_iter()
        .map(Event::from_row)
        .collect()
}

pub async fn create(
    db_pool: &SqlitePool,
    NewEvent { name, description, date }: NewEvent,
) -> AppResult<Event> {
    let Some(name) = non_blank(name) else {
        return Err(AppError::validation("Event name is required"));
    };
    let description = non_blank(description);
    let date = date.map(db::to_millis);

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO events (id,name,description,date) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(&name)
        .bind(&description)
        .bind(date)
        .execute(db_pool)
        .await?;

    info!(%id, "created event {name}");
    Event::from_row((id.to_string(), name, description, date))
}

pub async fn exists(db_pool: &SqlitePool, id: Uuid) -> AppResult<bool> {
    Ok(sqlx::query("SELECT 1 FROM events WHERE id=?")
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await?
        .is_some())
}
