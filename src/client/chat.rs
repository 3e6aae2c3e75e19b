use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::{self, Instant, MissedTickBehavior}};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{db::{Message, User}, messages::NewMessage, users::NewUser};

use super::Api;

/// One open chat room.
///
/// Opening mints an anonymous user and starts polling the event's messages;
/// the poll task lives exactly as long as the room. Drop it (or call
/// [`ChatRoom::close`]) when leaving the screen or switching events.
pub struct ChatRoom {
    api: Api,
    event: Uuid,
    user: Option<User>,
    messages: Arc<watch::Sender<Vec<Message>>>,
    poller: JoinHandle<()>,
}

impl ChatRoom {
    pub async fn open(api: Api, event: Uuid, interval: Duration) -> Self {
        let user = match api.create_user(&NewUser::anonymous()).await {
            Ok(user) => {
                info!(user = %user.id, "chatting as {}", user.name);
                Some(user)
            }
            Err(e) => {
                warn!("Failed to create anon user: {e:#}");
                None
            }
        };

        let messages = Arc::new(watch::channel(Vec::new()).0);
        fetch(&api, event, &messages).await;
        let poller = tokio::spawn(poll(api.clone(), event, messages.clone(), interval));

        Self { api, event, user, messages, poller }
    }

    pub fn event(&self) -> Uuid {
        self.event
    }

    /// The identity this room posts as, if minting it worked.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        !self.poller.is_finished()
    }

    /// Posts `text` and appends the stored message. Blank text is ignored.
    pub async fn send(&self, text: &str) -> Option<Message> {
        if text.trim().is_empty() {
            return None;
        }
        let Some(user) = &self.user else {
            warn!("Failed to send message: no user for this room");
            return None;
        };

        match self.api.post_message(&NewMessage::new(self.event, user.id, text)).await {
            Ok(message) => {
                self.messages.send_modify(|messages| {
                    if !messages.iter().any(|m| m.id == message.id) {
                        messages.push(message.clone());
                    }
                });
                Some(message)
            }
            Err(e) => {
                warn!("Failed to send message: {e:#}");
                None
            }
        }
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ChatRoom {
    fn drop(&mut self) {
        debug!(event = %self.event, "closing chat room");
        self.poller.abort();
    }
}

async fn poll(api: Api, event: Uuid, messages: Arc<watch::Sender<Vec<Message>>>, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        fetch(&api, event, &messages).await;
    }
}

async fn fetch(api: &Api, event: Uuid, messages: &watch::Sender<Vec<Message>>) {
    match api.list_messages(event).await {
        Ok(fresh) => {
            messages.send_if_modified(|current| {
                if *current == fresh {
                    return false;
                }
                *current = fresh;
                true
            });
        }
        Err(e) => warn!("Failed to load messages: {e:#}"),
    }
}
