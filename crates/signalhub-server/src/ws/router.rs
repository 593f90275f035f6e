use super::room::SignalRoom;
use signalhub_protocol::SignalMessage;

/// Where an inbound message goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Unicast(String),
    Broadcast,
    Drop,
}

/// Offer, answer and candidate are relayed: to the named target when there is
/// one, otherwise to everyone else in the room. Everything else, including
/// join/leave/error sent by a client, is dropped.
pub fn route_for(message: &SignalMessage) -> Route {
    if !message.is_relayable() {
        return Route::Drop;
    }

    match message.target() {
        Some(target) => Route::Unicast(target.to_string()),
        None => Route::Broadcast,
    }
}

/// Stamp an inbound message with the sending connection's identity and hand
/// it to the room. The sender never hears back about the outcome.
pub async fn dispatch<R>(room: &R, peer_id: &str, mut message: SignalMessage) -> Route
where
    R: SignalRoom + ?Sized,
{
    message.stamp(peer_id, room.id());

    let route = route_for(&message);
    match &route {
        Route::Unicast(target) => {
            room.unicast(&message, target).await;
        }
        Route::Broadcast => {
            room.broadcast(&message, peer_id).await;
        }
        Route::Drop => {
            tracing::warn!(
                "Unknown message type {:?} from peer {} in room {}",
                message.kind.as_str(),
                peer_id,
                room.id()
            );
        }
    }

    route
}
