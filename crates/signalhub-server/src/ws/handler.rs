use super::connection::{inbound_pump, outbound_pump, PeerHandle};
use super::room::{Room, SignalRoom};
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use futures_util::StreamExt;
use signalhub_protocol::{ConnectParams, RoomMetadata, SignalMessage};
use std::sync::Arc;

/// `GET /ws/signal/{room}`: the room may be named by id or by code. It must
/// exist and have a free slot before the upgrade is accepted.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_identifier): Path<String>,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Result<Response> {
    let metadata = state.directory.resolve(&room_identifier).await?;

    if metadata.is_full() {
        tracing::info!(
            "Rejecting join to full room {} ({}/{})",
            metadata.id,
            metadata.peer_count,
            metadata.max_peers
        );
        return Err(AppError::RoomFull {
            max_peers: metadata.max_peers,
        });
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, metadata, params.display_name)))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    metadata: RoomMetadata,
    display_name: Option<String>,
) {
    let settings = state.config.signaling.clone();
    let (peer, outbound) = PeerHandle::new(&metadata.id, settings.queue_capacity);
    let peer_id = peer.peer_id().to_string();
    let room_id = metadata.id.clone();

    if let Some(name) = display_name.as_deref().filter(|n| !n.is_empty()) {
        tracing::info!("Peer {} joining as '{}'", peer_id, name);
    }

    // The acknowledgement is queued before the peer becomes visible to the
    // room, so it is always the first frame the joiner reads.
    peer.send_message(&SignalMessage::join(&peer_id, &room_id));
    let room = state.registry.join(peer.clone()).await;
    room.broadcast(&SignalMessage::join(&peer_id, &room_id), &peer_id)
        .await;
    drop(peer);

    tracing::info!(
        "Peer {} joined room {} (code: {}) - {}/{} peers",
        peer_id,
        room_id,
        metadata.code,
        room.peer_count().await,
        metadata.max_peers
    );

    if let Err(e) = state.directory.add_peer(&room_id, &peer_id).await {
        tracing::warn!("Failed to record peer {} in room directory: {}", peer_id, e);
    }

    let (sink, stream) = socket.split();

    let mut send_task = tokio::spawn(outbound_pump(
        sink,
        outbound,
        settings.ping_interval,
        settings.write_timeout,
    ));
    let mut recv_task = tokio::spawn(inbound_pump(
        stream,
        room.clone(),
        peer_id.clone(),
        settings.read_timeout,
    ));

    // Whichever side stops first takes the socket down with it; aborting the
    // sibling drops the other half.
    let finished = tokio::select! {
        exit = &mut send_task => {
            recv_task.abort();
            exit
        }
        exit = &mut recv_task => {
            send_task.abort();
            exit
        }
    };

    match finished {
        Ok(exit) => tracing::debug!("Connection for peer {} ended: {}", peer_id, exit),
        Err(e) if e.is_panic() => {
            tracing::error!("Pump for peer {} panicked: {}", peer_id, e)
        }
        Err(_) => {}
    }

    teardown(&state, &room, &peer_id).await;
}

/// Runs once per connection, after both pumps are gone.
async fn teardown(state: &AppState, room: &Arc<Room>, peer_id: &str) {
    room.remove_peer(peer_id).await;
    state.registry.remove_if_empty(room).await;

    if let Err(e) = state.directory.remove_peer(room.id(), peer_id).await {
        tracing::warn!(
            "Failed to remove peer {} from room directory: {}",
            peer_id,
            e
        );
    }

    room.broadcast(&SignalMessage::leave(peer_id, room.id()), peer_id)
        .await;

    tracing::info!("Peer {} left room {}", peer_id, room.id());
}
