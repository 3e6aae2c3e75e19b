#![allow(dead_code)]

use std::net::SocketAddr;

use dancewithme::{db, router, AppState, StoreOptions};
use sqlx::SqlitePool;
use tokio::net::TcpListener;

pub struct TestServer {
    pub base: String,
    pub state: AppState,
}

impl TestServer {
    pub fn db_pool(&self) -> &SqlitePool {
        &self.state.db_pool
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn ws_url(&self) -> String {
        format!("{}/ws", self.base.replacen("http://", "ws://", 1))
    }
}

/// Serves a fresh in-memory store on an ephemeral port for the rest of the test.
pub async fn spawn(store: StoreOptions) -> TestServer {
    spawn_with(store, false).await
}

/// Same as [`spawn`] with the room socket mounted at `/api/ws`.
pub async fn spawn_realtime(store: StoreOptions) -> TestServer {
    spawn_with(store, true).await
}

async fn spawn_with(store: StoreOptions, realtime: bool) -> TestServer {
    let db_pool = db::memory().await.unwrap();
    let state = AppState::new(db_pool, store);
    let app = router(state.clone(), realtime);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}/api"),
        state,
    }
}

pub async fn count(db_pool: &SqlitePool, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db_pool)
        .await
        .unwrap();
    count
}
