use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod game;
mod http;
mod room;
mod store;
mod telemetry;
mod util;

use crate::config::GameSettings;
use crate::http::routes::{self, AppState};
use crate::room::RoomManager;
use crate::store::{MemoryStore, RedisStore, SharedStore};

async fn open_store() -> anyhow::Result<SharedStore> {
    match config::redis_url() {
        Some(url) => {
            let store = RedisStore::connect(&url).await?;
            tracing::info!("using redis store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("REDIS_URL not set, keeping state in process memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let settings = GameSettings::from_env();
    tracing::info!(?settings, "game settings");
    let rooms = RoomManager::new(open_store().await?, settings);

    let app = routes::router(AppState { rooms })
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config::server_addr();
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
