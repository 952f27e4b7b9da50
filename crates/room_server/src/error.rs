//! Error types for the room server.
//!
//! Room-level failures are wrapped as they are; everything the registry or
//! the transport boundary adds on top has its own category.

use huddle_presence::{RoomError, RoomIdError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Registry failures such as refusing work during shutdown
    #[error("Internal error: {0}")]
    Internal(String),

    /// A room operation failed
    #[error("Room error: {0}")]
    Room(#[from] RoomError),

    /// A room id that is neither anonymous nor private
    #[error("Invalid room id: {0}")]
    RoomId(#[from] RoomIdError),

    /// Invalid server configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// Whether the failure means the affected room must be discarded.
    pub fn is_fatal_for_room(&self) -> bool {
        matches!(self, ServerError::Room(e) if e.is_fatal())
    }
}
