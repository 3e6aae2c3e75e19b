use std::sync::Arc;

use tokio::sync::broadcast;

use crate::db::Message;

const CAPACITY: usize = 64;

/// Fan-out of freshly stored messages to open room sockets.
///
/// Every socket gets every message and drops the ones for rooms it hasn't
/// joined. Publishing with nobody listening is fine.
#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<Arc<Message>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self { tx: broadcast::channel(CAPACITY).0 }
    }
}

impl Hub {
    pub fn publish(&self, message: Message) -> Arc<Message> {
        let message = Arc::new(message);
        let _ = self.tx.send(message.clone());
        message
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Message>> {
        self.tx.subscribe()
    }
}
