//! # Outbound Events and Delivery Handles
//!
//! Everything the presence engine tells the outside world flows through one of
//! three typed event enums:
//!
//! - [`ZoneEvent`] - enter/move/leave/emote, delivered to zone listeners
//! - [`AdminEvent`] - user join/leave, delivered to attached admin sessions
//! - [`GroupEvent`] - a participant entered or left a proximity group
//!
//! Each consumer registers a handle wrapping a `tokio::sync::mpsc` unbounded
//! sender. Sending never blocks and never awaits, so events are pushed inside
//! the room's critical section and arrive in the order the room applied the
//! updates. The transport drains the receiving half at its own pace.
//!
//! ## Design Principles
//!
//! - **Decoupling**: The room knows nothing about sockets, only about channels
//! - **No Re-entrancy**: A handler cannot call back into the room while it is
//!   being mutated because delivery is a plain channel send
//! - **Serialization**: All events serialize to tagged JSON for the wire layer

use crate::movable::MovableSnapshot;
use crate::types::{AdminSessionId, ConnectionId, GroupId, ListenerId, SessionId};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// Event Types
// ============================================================================

/// Notification delivered to a zone listener about a movable in its area.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneEvent {
    /// The movable appeared in the listener's neighbourhood
    Enter { movable: MovableSnapshot },
    /// The movable moved but stayed visible
    Move { movable: MovableSnapshot },
    /// The movable left the listener's neighbourhood (or the room)
    Leave { movable: MovableSnapshot },
    /// The movable played an emote
    Emote { movable: MovableSnapshot, emote: String },
}

impl ZoneEvent {
    /// The movable this event is about.
    pub fn movable(&self) -> &MovableSnapshot {
        match self {
            ZoneEvent::Enter { movable }
            | ZoneEvent::Move { movable }
            | ZoneEvent::Leave { movable }
            | ZoneEvent::Emote { movable, .. } => movable,
        }
    }
}

/// Notification delivered to admin sessions watching a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminEvent {
    UserJoin {
        uuid: Uuid,
        name: String,
        ip_address: String,
    },
    UserLeft {
        uuid: Uuid,
    },
}

/// Group membership change, used by the transport to open or close media links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupEvent {
    Joined {
        group_id: GroupId,
        session_id: SessionId,
        connection: ConnectionId,
    },
    Left {
        group_id: GroupId,
        session_id: SessionId,
        connection: ConnectionId,
    },
}

/// Sending half of the room-wide group notification channel.
pub type GroupEventSender = mpsc::UnboundedSender<GroupEvent>;

// ============================================================================
// Delivery Handles
// ============================================================================

/// A transport handle interested in the zones around one viewport.
#[derive(Debug, Clone)]
pub struct ZoneListener {
    id: ListenerId,
    sender: mpsc::UnboundedSender<ZoneEvent>,
}

impl ZoneListener {
    /// Wraps an existing sender.
    pub fn new(id: ListenerId, sender: mpsc::UnboundedSender<ZoneEvent>) -> Self {
        Self { id, sender }
    }

    /// Creates a listener together with the receiver its events arrive on.
    pub fn channel(id: ListenerId) -> (Self, mpsc::UnboundedReceiver<ZoneEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(id, sender), receiver)
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Pushes an event to the listener. Returns `false` if the receiving side is gone.
    pub(crate) fn deliver(&self, event: ZoneEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!("📭 Zone listener {:?} is closed, dropping event", self.id);
                false
            }
        }
    }
}

/// An attached admin session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    id: AdminSessionId,
    sender: mpsc::UnboundedSender<AdminEvent>,
}

impl AdminSession {
    pub fn new(id: AdminSessionId, sender: mpsc::UnboundedSender<AdminEvent>) -> Self {
        Self { id, sender }
    }

    /// Creates an admin session together with the receiver its events arrive on.
    pub fn channel(id: AdminSessionId) -> (Self, mpsc::UnboundedReceiver<AdminEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(id, sender), receiver)
    }

    pub fn id(&self) -> AdminSessionId {
        self.id
    }

    pub(crate) fn send_user_join(&self, uuid: Uuid, name: &str, ip_address: &str) {
        self.deliver(AdminEvent::UserJoin {
            uuid,
            name: name.to_string(),
            ip_address: ip_address.to_string(),
        });
    }

    pub(crate) fn send_user_left(&self, uuid: Uuid) {
        self.deliver(AdminEvent::UserLeft { uuid });
    }

    fn deliver(&self, event: AdminEvent) {
        if self.sender.send(event).is_err() {
            debug!("📭 Admin session {:?} is closed, dropping event", self.id);
        }
    }
}
