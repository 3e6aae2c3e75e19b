use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use tracing::info;

/// Where events without a date land in the event listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndatedEvents {
    First,
    #[default]
    Last,
}

impl FromStr for UndatedEvents {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(anyhow!("expected `first` or `last`, got `{other}`")),
        }
    }
}

/// What `GET /messages/{eventId}` does for an event that doesn't exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownEventMessages {
    #[default]
    Empty,
    NotFound,
}

impl FromStr for UnknownEventMessages {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Self::Empty),
            "not_found" => Ok(Self::NotFound),
            other => Err(anyhow!("expected `empty` or `not_found`, got `{other}`")),
        }
    }
}

/// Store behavior the handlers consult. Cheap to copy into state.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub undated_events: UndatedEvents,
    pub unknown_event_messages: UnknownEventMessages,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub realtime: bool,
    pub store: StoreOptions,
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            port: try_load("PORT", "4000")?,
            database_url: try_load("DATABASE_URL", "sqlite://dance-with-me.db?mode=rwc")?,
            realtime: try_load("REALTIME", "false")?,
            store: StoreOptions {
                undated_events: try_load("UNDATED_EVENTS", "last")?,
                unknown_event_messages: try_load("UNKNOWN_EVENT_MESSAGES", "empty")?,
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let api_base: String = try_load("API_BASE", "http://localhost:4000/api")?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_owned(),
            poll_interval: Duration::from_millis(try_load("POLL_INTERVAL_MS", "3000")?),
        })
    }
}

fn try_load<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value `{value}`"))
}
