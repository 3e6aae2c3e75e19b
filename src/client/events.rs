use tracing::warn;

use crate::{db::Event, events::NewEvent};

use super::Api;

/// Event list with the two creation drafts.
#[derive(Debug, Default)]
pub struct EventsScreen {
    pub events: Vec<Event>,
    pub name: String,
    pub description: String,
}

impl EventsScreen {
    pub async fn refresh(&mut self, api: &Api) {
        match api.list_events().await {
            Ok(events) => self.events = events,
            Err(e) => warn!("Failed to load events: {e:#}"),
        }
    }

    /// Posts the drafts as a new event and puts it on top. Blank name does nothing.
    pub async fn add_event(&mut self, api: &Api) -> Option<&Event> {
        if self.name.trim().is_empty() {
            return None;
        }

        let new_event = NewEvent {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()).filter(|d| !d.trim().is_empty()),
            date: None,
        };
        match api.create_event(&new_event).await {
            Ok(event) => {
                self.events.insert(0, event);
                self.name.clear();
                self.description.clear();
                self.events.first()
            }
            Err(e) => {
                warn!("Failed to create event: {e:#}");
                None
            }
        }
    }
}
