use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room metadata as held by the room directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomMetadata {
    pub id: String,
    /// Short, shareable room code (e.g. "K7QM2X")
    pub code: String,
    /// User id of the creator, taken from their token
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(alias = "maxPlayers")]
    pub max_peers: u32,
    #[serde(alias = "playerCount")]
    pub peer_count: u32,
}

impl RoomMetadata {
    pub fn is_full(&self) -> bool {
        self.peer_count >= self.max_peers
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default, alias = "maxPlayers")]
    pub max_peers: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
}

/// Query parameters accepted on the signaling upgrade request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub display_name: Option<String>,
}
