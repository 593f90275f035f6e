//! Signalhub Server Library
//!
//! WebRTC signaling relay: peers connect over WebSocket into a room and the
//! server forwards offer/answer/candidate messages between them. This module
//! exposes the server components for testing and embedding.

pub mod api;
pub mod auth;
pub mod directory;
pub mod error;
pub mod state;
pub mod ws;

use anyhow::Result;
use directory::{MemoryRoomDirectory, PgRoomDirectory, RoomDirectory};
use state::{AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Build the application on top of an already constructed room directory.
pub fn build_app(config: Config, directory: Arc<dyn RoomDirectory>) -> (axum::Router, AppState) {
    let state = AppState::new(config, directory);
    let router = api::create_router(state.clone());
    (router, state)
}

/// Create and configure the server application, picking the room directory
/// from the configuration.
pub async fn create_app(config: Config) -> Result<(axum::Router, AppState)> {
    let directory: Arc<dyn RoomDirectory> = match &config.database_url {
        Some(url) => Arc::new(PgRoomDirectory::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, room directory is kept in memory");
            Arc::new(MemoryRoomDirectory::new())
        }
    };

    Ok(build_app(config, directory))
}

/// Periodically drop expired rooms and memberships from the directory.
pub fn spawn_directory_sweeper(
    directory: Arc<dyn RoomDirectory>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match directory.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Purged {} expired rooms", n),
                Err(e) => tracing::warn!("Room directory sweep failed: {}", e),
            }
        }
    })
}
