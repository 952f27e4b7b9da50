//! Error types for room operations.
//!
//! Three kinds of failure exist, and only two of them are errors:
//!
//! * **Validation** - the caller handed over something unusable
//!   ([`RoomError::MissingPosition`], [`RoomError::InvalidPosition`]).
//!   Nothing is mutated.
//! * **Consistency warnings** - late or duplicate signals from the transport
//!   (leaving twice, toggling silent to its current value). These are logged
//!   and absorbed, never returned.
//! * **Invariant violations** - the room's own bookkeeping is wrong. The
//!   operation aborts with [`RoomError::InvariantViolation`] and the room is
//!   poisoned: every later mutation fails with [`RoomError::Poisoned`].

use crate::types::GroupId;

/// Errors returned by [`crate::GameRoom`] and [`crate::Group`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The join request did not carry a position
    #[error("Missing position in join request")]
    MissingPosition,

    /// A coordinate was not finite or lay outside the playable area
    #[error("Invalid position ({x}, {y})")]
    InvalidPosition { x: String, y: String },

    /// The group already holds its configured maximum of members
    #[error("Group {0} is full")]
    GroupFull(GroupId),

    /// Internal bookkeeping is inconsistent; the room can no longer be trusted
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A previous invariant violation disabled this room
    #[error("Room {0} is poisoned after an invariant violation")]
    Poisoned(String),
}

impl RoomError {
    /// Whether the room that produced this error must be discarded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RoomError::InvariantViolation(_) | RoomError::Poisoned(_))
    }
}

/// Errors produced while decomposing a room identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomIdError {
    #[error("Room id is empty")]
    Empty,

    #[error("Unrecognised room id prefix in '{0}'")]
    UnknownPrefix(String),

    #[error("Malformed room id '{0}'")]
    Malformed(String),
}
