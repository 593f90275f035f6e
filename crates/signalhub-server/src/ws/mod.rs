//! Live signaling: the room registry, per-connection pumps and the message
//! router.

pub mod connection;
pub mod handler;
pub mod registry;
pub mod room;
pub mod router;
