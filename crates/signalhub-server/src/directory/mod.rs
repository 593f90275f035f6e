//! Room directory: the metadata, capacity and membership store consulted
//! around the live signaling core.
//!
//! The in-memory registry under [`crate::ws`] is the only authority for who
//! receives a broadcast. Membership recorded here is best effort and may lag
//! behind it; entries carry an expiry so anything a missed teardown leaves
//! behind ages out on its own.

mod memory;
mod postgres;

pub use memory::MemoryRoomDirectory;
pub use postgres::PgRoomDirectory;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Duration;
use rand::Rng;
use signalhub_protocol::RoomMetadata;

pub const ROOM_CODE_LENGTH: usize = 6;
/// Ambiguous glyphs (0/O, 1/I) left out
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const DEFAULT_MAX_PEERS: u32 = 8;
pub const MIN_MAX_PEERS: u32 = 2;
pub const MAX_MAX_PEERS: u32 = 16;

pub fn default_ttl() -> Duration {
    Duration::hours(24)
}

#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Register a new room and hand back its metadata (id and shareable code).
    async fn create(&self, creator_id: &str, max_peers: u32) -> Result<RoomMetadata>;

    /// Look a room up by id or by shareable code. `peer_count` is current.
    async fn resolve(&self, identifier: &str) -> Result<RoomMetadata>;

    /// Remove a room. Only its creator may do so.
    async fn delete(&self, room_id: &str, requester_id: &str) -> Result<()>;

    /// Record a member and refresh the membership expiry.
    async fn add_peer(&self, room_id: &str, peer_id: &str) -> Result<()>;

    async fn remove_peer(&self, room_id: &str, peer_id: &str) -> Result<()>;

    async fn peer_count(&self, room_id: &str) -> Result<u32>;

    /// Drop expired rooms and memberships, returning how many rooms went away.
    async fn purge_expired(&self) -> Result<usize>;
}

pub fn validate_max_peers(max_peers: u32) -> Result<()> {
    if !(MIN_MAX_PEERS..=MAX_MAX_PEERS).contains(&max_peers) {
        return Err(AppError::BadRequest(format!(
            "maxPeers must be between {} and {}",
            MIN_MAX_PEERS, MAX_MAX_PEERS
        )));
    }
    Ok(())
}

/// Identifiers of exactly [`ROOM_CODE_LENGTH`] characters are codes; anything
/// else is a room id.
pub fn is_room_code(identifier: &str) -> bool {
    identifier.chars().count() == ROOM_CODE_LENGTH
}

pub fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}
