use std::collections::HashSet;

use axum::{
    debug_handler,
    extract::{
        ws::{Message as Frame, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::Message;

use super::{post_message, Hub, NewMessage};

/// What a socket may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub(crate) enum ClientFrame {
    JoinEvent { event_id: Uuid },
    LeaveEvent { event_id: Uuid },
    SendMessage(NewMessage),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerFrame<'a> {
    Message(&'a Message),
}

/// Rooms one connection is currently in.
#[derive(Debug, Default)]
pub(crate) struct Subscriptions(HashSet<Uuid>);

impl Subscriptions {
    /// Applies joins and leaves, passes sends back to the caller.
    pub(crate) fn apply(&mut self, frame: ClientFrame) -> Option<NewMessage> {
        match frame {
            ClientFrame::JoinEvent { event_id } => {
                self.0.insert(event_id);
                None
            }
            ClientFrame::LeaveEvent { event_id } => {
                self.0.remove(&event_id);
                None
            }
            ClientFrame::SendMessage(new_message) => Some(new_message),
        }
    }

    pub(crate) fn wants(&self, message: &Message) -> bool {
        self.0.contains(&message.event)
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    State(db_pool): State<SqlitePool>,
    State(hub): State<Hub>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |socket| room_socket(socket, db_pool, hub).await)
}

async fn room_socket(socket: WebSocket, db_pool: SqlitePool, hub: Hub) {
    let connection = Uuid::now_v7();
    info!(%connection, "room socket connected");

    let mut rx = hub.subscribe();
    let (mut sender, mut receiver) = socket.split();
    let mut rooms = Subscriptions::default();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(Ok(frame)) = incoming else {
                    break;
                };
                let data = match frame {
                    Frame::Text(_) | Frame::Binary(_) => frame.into_data(),
                    Frame::Close(_) => break,
                    _ => continue,
                };
                let frame = match serde_json::from_slice::<ClientFrame>(&data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!(%connection, "ignoring frame: {e}");
                        continue;
                    }
                };

                if let Some(new_message) = rooms.apply(frame) {
                    // the hub echoes it back to us like to everyone else
                    if let Err(e) = post_message(&db_pool, &hub, new_message).await {
                        warn!(%connection, "dropping socket message: {e}");
                    }
                }
            }
            published = rx.recv() => {
                let message = match published {
                    Ok(message) => message,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%connection, skipped, "room socket fell behind");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !rooms.wants(&message) {
                    continue;
                }

                let json = match serde_json::to_string(&ServerFrame::Message(&message)) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(%connection, "could not encode message: {e}");
                        continue;
                    }
                };
                if sender.send(Frame::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(%connection, "room socket disconnected");
}
