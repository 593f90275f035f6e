use crate::auth::AuthUser;
use crate::directory::DEFAULT_MAX_PEERS;
use crate::error::Result;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use signalhub_protocol::{CreateRoomRequest, CreateRoomResponse, RoomMetadata};

pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>)> {
    let max_peers = input
        .max_peers
        .filter(|&n| n != 0)
        .unwrap_or(DEFAULT_MAX_PEERS);

    let room = state.directory.create(&auth.user_id, max_peers).await?;

    tracing::info!(
        "Room created: {} (code: {}) by user {}",
        room.id,
        room.code,
        auth.user_id
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_id: room.id,
            code: room.code,
        }),
    ))
}

/// Public lookup by id or shareable code, with the current peer count.
pub async fn get_room(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<RoomMetadata>> {
    let room = state.directory.resolve(&identifier).await?;
    Ok(Json(room))
}

pub async fn delete_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<Value>> {
    state.directory.delete(&room_id, &auth.user_id).await?;

    tracing::info!("Room deleted: {} by user {}", room_id, auth.user_id);

    Ok(Json(json!({ "message": "Room deleted" })))
}
