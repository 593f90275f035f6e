//! Per-socket duplex pump: one task reading frames into the router, one task
//! draining the peer's bounded queue onto the socket.

use super::room::Room;
use super::router;
use axum::body::Bytes;
use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use signalhub_protocol::SignalMessage;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{timeout, Instant};
use uuid::Uuid;

/// Sending side of one connected peer, as stored in its room.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    peer_id: String,
    room_id: String,
    outbound: mpsc::Sender<String>,
}

impl PeerHandle {
    /// A fresh peer with a server-generated id, plus the queue its outbound
    /// pump drains.
    pub fn new(room_id: &str, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        Self::with_id(Uuid::new_v4().to_string(), room_id, capacity)
    }

    pub fn with_id(
        peer_id: impl Into<String>,
        room_id: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let peer = Self {
            peer_id: peer_id.into(),
            room_id: room_id.into(),
            outbound: tx,
        };
        (peer, rx)
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Enqueue an already serialized frame without waiting.
    pub fn try_send(&self, json: String) -> Result<(), TrySendError<String>> {
        self.outbound.try_send(json)
    }

    /// Serialize and enqueue, logging instead of failing.
    pub fn send_message(&self, message: &SignalMessage) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return;
            }
        };

        if self.try_send(json).is_err() {
            tracing::warn!("Failed to queue message for peer {}", self.peer_id);
        }
    }
}

/// Why a pump stopped
#[derive(Debug, PartialEq, Eq)]
pub enum PumpExit {
    /// Peer closed the socket or the stream ended
    Closed,
    ReadTimeout,
    ReadError(String),
    WriteTimeout,
    WriteError(String),
    /// Every sender of the outbound queue is gone
    QueueClosed,
}

impl fmt::Display for PumpExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpExit::Closed => write!(f, "closed by peer"),
            PumpExit::ReadTimeout => write!(f, "read deadline exceeded"),
            PumpExit::ReadError(e) => write!(f, "read error: {}", e),
            PumpExit::WriteTimeout => write!(f, "write deadline exceeded"),
            PumpExit::WriteError(e) => write!(f, "write error: {}", e),
            PumpExit::QueueClosed => write!(f, "outbound queue closed"),
        }
    }
}

/// Read frames until the socket fails, closes, or stays silent for longer
/// than `read_timeout`. Every frame, pongs included, restarts the deadline.
pub async fn inbound_pump<S, E>(
    mut stream: S,
    room: Arc<Room>,
    peer_id: String,
    read_timeout: Duration,
) -> PumpExit
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        let frame = match timeout(read_timeout, stream.next()).await {
            Err(_) => return PumpExit::ReadTimeout,
            Ok(None) => return PumpExit::Closed,
            Ok(Some(Err(e))) => return PumpExit::ReadError(e.to_string()),
            Ok(Some(Ok(frame))) => frame,
        };

        let decoded = match frame {
            Message::Text(text) => SignalMessage::from_json(text.as_str()),
            Message::Binary(bytes) => SignalMessage::from_json_slice(&bytes),
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return PumpExit::Closed,
        };

        match decoded {
            Ok(message) => {
                router::dispatch(room.as_ref(), &peer_id, message).await;
            }
            Err(e) => {
                tracing::warn!("Failed to parse message from peer {}: {}", peer_id, e);
            }
        }
    }
}

/// Write queued frames and keepalive pings until a write fails or times out.
pub async fn outbound_pump<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<String>,
    ping_interval: Duration,
    write_timeout: Duration,
) -> PumpExit
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let mut keepalive = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        let frame = tokio::select! {
            queued = outbound.recv() => match queued {
                Some(json) => Message::Text(json.into()),
                None => {
                    let _ = timeout(write_timeout, sink.send(Message::Close(None))).await;
                    return PumpExit::QueueClosed;
                }
            },
            _ = keepalive.tick() => Message::Ping(Bytes::new()),
        };

        match timeout(write_timeout, sink.send(frame)).await {
            Err(_) => return PumpExit::WriteTimeout,
            Ok(Err(e)) => return PumpExit::WriteError(e.to_string()),
            Ok(Ok(())) => {}
        }
    }
}
