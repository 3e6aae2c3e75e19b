//! HTTP client for the `/api` surface, plus the per-screen state the mobile
//! app keeps around.
//!
//! Screens never surface errors: a failed call is logged and the screen keeps
//! what it had.

mod chat;
mod events;
mod swipe;

use anyhow::{anyhow, Context};
use reqwest::Response;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::ClientConfig,
    db::{Event, Message, User},
    events::NewEvent,
    messages::NewMessage,
    users::NewUser,
};

pub use chat::ChatRoom;
pub use events::EventsScreen;
pub use swipe::SwipeDeck;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct Api {
    http: reqwest::Client,
    base: String,
}

impl Api {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_base.clone())
    }

    pub async fn list_events(&self) -> anyhow::Result<Vec<Event>> {
        self.get("/events").await
    }

    pub async fn create_event(&self, new_event: &NewEvent) -> anyhow::Result<Event> {
        self.post("/events", new_event).await
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        self.get("/users").await
    }

    pub async fn create_user(&self, new_user: &NewUser) -> anyhow::Result<User> {
        self.post("/users", new_user).await
    }

    pub async fn list_messages(&self, event_id: Uuid) -> anyhow::Result<Vec<Message>> {
        self.get(&format!("/messages/{event_id}")).await
    }

    pub async fn post_message(&self, new_message: &NewMessage) -> anyhow::Result<Message> {
        self.post("/messages", new_message).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let response = self.http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        decode(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> anyhow::Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let response = self.http
            .post(format!("{}{path}", self.base))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let error = match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error }) => error,
        Err(_) => "no error message".to_owned(),
    };
    Err(anyhow!("{status}: {error}"))
}
