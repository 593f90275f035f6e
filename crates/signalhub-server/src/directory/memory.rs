use super::{default_ttl, generate_room_code, is_room_code, validate_max_peers, RoomDirectory};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use signalhub_protocol::RoomMetadata;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

struct RoomEntry {
    metadata: RoomMetadata,
    expires_at: DateTime<Utc>,
}

struct Membership {
    peers: HashSet<String>,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    rooms: HashMap<String, RoomEntry>,
    /// code -> room id
    codes: HashMap<String, String>,
    members: HashMap<String, Membership>,
}

impl Tables {
    fn live_room(&self, room_id: &str, now: DateTime<Utc>) -> Option<&RoomMetadata> {
        self.rooms
            .get(room_id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| &entry.metadata)
    }

    fn live_count(&self, room_id: &str, now: DateTime<Utc>) -> u32 {
        self.members
            .get(room_id)
            .filter(|m| m.expires_at > now)
            .map(|m| m.peers.len() as u32)
            .unwrap_or(0)
    }

    fn code_in_use(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.codes
            .get(code)
            .is_some_and(|room_id| self.live_room(room_id, now).is_some())
    }
}

/// Process-local room directory. Used when no database is configured, and by
/// tests.
pub struct MemoryRoomDirectory {
    tables: RwLock<Tables>,
    ttl: Duration,
}

impl MemoryRoomDirectory {
    pub fn new() -> Self {
        Self::with_ttl(default_ttl())
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            ttl,
        }
    }
}

impl Default for MemoryRoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomDirectory for MemoryRoomDirectory {
    async fn create(&self, creator_id: &str, max_peers: u32) -> Result<RoomMetadata> {
        validate_max_peers(max_peers)?;

        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let mut code = generate_room_code();
        while tables.code_in_use(&code, now) {
            code = generate_room_code();
        }

        let metadata = RoomMetadata {
            id: Uuid::new_v4().to_string(),
            code: code.clone(),
            creator_id: creator_id.to_string(),
            created_at: now,
            max_peers,
            peer_count: 0,
        };

        tables.codes.insert(code, metadata.id.clone());
        tables.rooms.insert(
            metadata.id.clone(),
            RoomEntry {
                metadata: metadata.clone(),
                expires_at: now + self.ttl,
            },
        );

        Ok(metadata)
    }

    async fn resolve(&self, identifier: &str) -> Result<RoomMetadata> {
        let now = Utc::now();
        let tables = self.tables.read().await;

        let room_id = if is_room_code(identifier) {
            tables
                .codes
                .get(identifier)
                .ok_or_else(AppError::room_not_found)?
                .as_str()
        } else {
            identifier
        };

        let mut metadata = tables
            .live_room(room_id, now)
            .cloned()
            .ok_or_else(AppError::room_not_found)?;
        metadata.peer_count = tables.live_count(room_id, now);

        Ok(metadata)
    }

    async fn delete(&self, room_id: &str, requester_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let metadata = tables
            .live_room(room_id, now)
            .ok_or_else(AppError::room_not_found)?;

        if metadata.creator_id != requester_id {
            return Err(AppError::Forbidden(
                "Only the room creator can delete the room".to_string(),
            ));
        }

        let code = metadata.code.clone();
        tables.rooms.remove(room_id);
        tables.codes.remove(&code);
        tables.members.remove(room_id);

        Ok(())
    }

    async fn add_peer(&self, room_id: &str, peer_id: &str) -> Result<()> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let mut tables = self.tables.write().await;

        if tables.live_room(room_id, now).is_none() {
            return Err(AppError::room_not_found());
        }

        let membership = tables
            .members
            .entry(room_id.to_string())
            .or_insert_with(|| Membership {
                peers: HashSet::new(),
                expires_at,
            });
        membership.peers.insert(peer_id.to_string());
        membership.expires_at = expires_at;

        Ok(())
    }

    async fn remove_peer(&self, room_id: &str, peer_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;

        if let Some(membership) = tables.members.get_mut(room_id) {
            membership.peers.remove(peer_id);
            if membership.peers.is_empty() {
                tables.members.remove(room_id);
            }
        }

        Ok(())
    }

    async fn peer_count(&self, room_id: &str) -> Result<u32> {
        let tables = self.tables.read().await;
        Ok(tables.live_count(room_id, Utc::now()))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let before = tables.rooms.len();
        tables.rooms.retain(|_, entry| entry.expires_at > now);
        let removed = before - tables.rooms.len();

        let Tables {
            rooms,
            codes,
            members,
        } = &mut *tables;
        codes.retain(|_, room_id| rooms.contains_key(room_id));
        members.retain(|_, m| m.expires_at > now);

        Ok(removed)
    }
}
