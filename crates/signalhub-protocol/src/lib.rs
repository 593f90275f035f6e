//! Shared protocol definitions for Signalhub
//!
//! This crate holds the types both ends of the relay agree on:
//! - The signaling envelope carried in every WebSocket frame
//! - Request/response bodies of the room REST API

pub mod messages;
pub mod types;

pub use messages::*;
pub use types::*;
