pub mod appresult;
pub mod client;
pub mod config;
pub mod db;
pub mod events;
pub mod messages;
pub mod users;

use axum::{extract::FromRef, routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult, During};
pub use config::StoreOptions;
pub use messages::Hub;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub hub: Hub,
    pub store: StoreOptions,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, store: StoreOptions) -> Self {
        Self {
            db_pool,
            hub: Hub::default(),
            store,
        }
    }
}

/// The whole HTTP surface. The room socket only exists when `realtime` is on.
pub fn router(state: AppState, realtime: bool) -> Router {
    let mut api = Router::new()
        .merge(events::router())
        .merge(users::router())
        .merge(messages::router());
    if realtime {
        api = api.merge(messages::ws_router());
    }

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
