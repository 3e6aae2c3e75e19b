mod hub;
mod list;
mod post;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use hub::Hub;
pub use list::list_for_event;
pub use post::{post_message, NewMessage};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(post::create_message))
        .route("/messages/{event_id}", get(list::list_messages))
}

pub fn ws_router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::room_ws))
}
