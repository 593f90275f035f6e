use super::connection::PeerHandle;
use async_trait::async_trait;
use signalhub_protocol::SignalMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
#[error("room {0} is closed")]
pub struct RoomClosed(pub String);

/// What the message router needs from a room, independent of how members are
/// stored or connected.
#[async_trait]
pub trait SignalRoom: Send + Sync {
    fn id(&self) -> &str;

    async fn add_peer(&self, peer: PeerHandle) -> Result<(), RoomClosed>;

    /// Returns whether the peer was a member. Removing twice is harmless.
    async fn remove_peer(&self, peer_id: &str) -> bool;

    /// Queue `message` for every member except `exclude_peer_id`; returns how
    /// many queues accepted it.
    async fn broadcast(&self, message: &SignalMessage, exclude_peer_id: &str) -> usize;

    /// Queue `message` for one member; returns whether it was accepted.
    async fn unicast(&self, message: &SignalMessage, target_peer_id: &str) -> bool;

    async fn peer_count(&self) -> usize;
}

/// Live membership of one room.
///
/// Add/remove take the write side of `peers`; broadcast and unicast iterate
/// under the read side. A room is marked closed (under the write lock) once
/// it is found empty, after which it never accepts members again.
pub struct Room {
    id: String,
    peers: RwLock<HashMap<String, PeerHandle>>,
    closed: AtomicBool,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            peers: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the room if nobody is in it. Returns whether it is now closed.
    pub(crate) async fn close_if_empty(&self) -> bool {
        let peers = self.peers.write().await;
        if peers.is_empty() {
            self.closed.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub async fn peer_ids(&self) -> Vec<String> {
        self.peers.read().await.keys().cloned().collect()
    }
}

/// Non-blocking hand-off to one peer's outbound queue.
fn deliver(peer: &PeerHandle, json: String) -> bool {
    match peer.try_send(json) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                "Dropping message for peer {}: outbound queue full",
                peer.peer_id()
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!("Peer {} is disconnecting, message dropped", peer.peer_id());
            false
        }
    }
}

fn encode(message: &SignalMessage) -> Option<String> {
    match message.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize {} message: {}", message.kind, e);
            None
        }
    }
}

#[async_trait]
impl SignalRoom for Room {
    fn id(&self) -> &str {
        &self.id
    }

    async fn add_peer(&self, peer: PeerHandle) -> Result<(), RoomClosed> {
        let mut peers = self.peers.write().await;
        if self.is_closed() {
            return Err(RoomClosed(self.id.clone()));
        }
        peers.insert(peer.peer_id().to_string(), peer);
        Ok(())
    }

    async fn remove_peer(&self, peer_id: &str) -> bool {
        self.peers.write().await.remove(peer_id).is_some()
    }

    async fn broadcast(&self, message: &SignalMessage, exclude_peer_id: &str) -> usize {
        let Some(json) = encode(message) else {
            return 0;
        };

        let peers = self.peers.read().await;
        peers
            .values()
            .filter(|peer| peer.peer_id() != exclude_peer_id)
            .filter(|peer| deliver(peer, json.clone()))
            .count()
    }

    async fn unicast(&self, message: &SignalMessage, target_peer_id: &str) -> bool {
        let peers = self.peers.read().await;
        let Some(peer) = peers.get(target_peer_id) else {
            tracing::debug!(
                "Target peer {} not found in room {}",
                target_peer_id,
                self.id
            );
            return false;
        };

        match encode(message) {
            Some(json) => deliver(peer, json),
            None => false,
        }
    }

    async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}
