use super::connection::PeerHandle;
use super::room::{Room, SignalRoom};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// All live rooms of this process, keyed by room id.
///
/// The map lock is only ever taken on its own, never while a room's lock is
/// held. A room found empty is closed before it is unlinked, so a join that
/// grabbed it just before can no longer add to it and instead retries against
/// a fresh room.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// The live room with this id, if any.
    pub async fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .filter(|room| !room.is_closed())
            .cloned()
    }

    /// Return the live room with this id, creating it (or replacing a closed
    /// one) when needed.
    pub async fn get_or_create(&self, room_id: &str) -> Arc<Room> {
        if let Some(room) = self.get(room_id).await {
            return room;
        }

        let mut rooms = self.rooms.write().await;
        match rooms.get(room_id) {
            Some(room) if !room.is_closed() => room.clone(),
            _ => {
                let room = Arc::new(Room::new(room_id));
                rooms.insert(room_id.to_string(), room.clone());
                tracing::info!("Created new room: {}", room_id);
                room
            }
        }
    }

    /// Add `peer` to the room named by its room id, creating the room if
    /// this is the first member.
    pub async fn join(&self, peer: PeerHandle) -> Arc<Room> {
        loop {
            let room = self.get_or_create(peer.room_id()).await;
            match room.add_peer(peer.clone()).await {
                Ok(()) => return room,
                Err(closed) => tracing::debug!("{}, retrying join", closed),
            }
        }
    }

    /// Close and unlink `room` if it has no members left. Returns whether
    /// this call removed it from the map; a room already replaced by a
    /// fresh one under the same id is closed but left alone.
    pub async fn remove_if_empty(&self, room: &Arc<Room>) -> bool {
        if !room.close_if_empty().await {
            return false;
        }

        let mut rooms = self.rooms.write().await;
        if !rooms
            .get(room.id())
            .is_some_and(|current| Arc::ptr_eq(current, room))
        {
            return false;
        }

        rooms.remove(room.id());
        tracing::info!("Removed empty room: {}", room.id());
        true
    }

    pub async fn room_count(&self) -> usize {
        self.rooms
            .read()
            .await
            .values()
            .filter(|room| !room.is_closed())
            .count()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
