//! # Huddle Presence
//!
//! The room-level presence engine of a shared 2D space: participants move
//! around, close participants are clustered into small proximity groups for
//! audio/video, and every viewport is told about what enters, moves within
//! or leaves the zones it looks at.
//!
//! ## Architecture Overview
//!
//! Leaf-first:
//!
//! - [`Movable`]: anything with a 2D position that can be tracked spatially.
//! - [`SpatialGrid`]: maps world coordinates to fixed-size zones and keeps,
//!   per zone, the movables inside and the listeners registered on it.
//! - [`PositionNotifier`]: tracks the zone of every movable and pushes
//!   [`ZoneEvent`]s to the listeners around it.
//! - [`Group`]: a cluster of participants, itself a movable located at the
//!   centroid of its members.
//! - [`GameRoom`]: owns all of the above for one room and runs the proximity
//!   algorithm on every position update.
//!
//! ## Quick Start Example
//!
//! ```rust
//! use huddle_presence::*;
//!
//! let mut room = GameRoom::new("_/global/maps.example.org/office.json", ProximityConfig::default());
//!
//! let (listener, mut zone_events) = ZoneListener::channel(ListenerId(1));
//! room.add_zone_listener(listener, 0.0, 0.0).unwrap();
//!
//! let alice = room
//!     .join(ConnectionId(1), JoinRequest::new("Alice", PointPosition::new(10.0, 10.0)))
//!     .unwrap()
//!     .id();
//! let bob = room
//!     .join(ConnectionId(2), JoinRequest::new("Bob", PointPosition::new(40.0, 10.0)))
//!     .unwrap()
//!     .id();
//!
//! // Close enough: they now share a group
//! let group = room.participant(alice).unwrap().group();
//! assert!(group.is_some());
//! assert_eq!(room.participant(bob).unwrap().group(), group);
//!
//! assert!(matches!(zone_events.try_recv(), Ok(ZoneEvent::Enter { .. })));
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod group;
pub mod movable;
pub mod notifier;
pub mod participant;
pub mod room;
pub mod room_id;
pub mod shutdown;
pub mod types;
pub mod zone;

#[cfg(test)]
mod tests;

pub use config::ProximityConfig;
pub use error::{RoomError, RoomIdError};
pub use events::{
    AdminEvent, AdminSession, GroupEvent, GroupEventSender, ZoneEvent, ZoneListener,
};
pub use group::Group;
pub use movable::{GroupSnapshot, Movable, MovableKey, MovableSnapshot, ParticipantSnapshot};
pub use notifier::PositionNotifier;
pub use participant::{JoinRequest, Participant};
pub use room::{GameRoom, RoomStats};
pub use room_id::RoomIdentifier;
pub use shutdown::ShutdownState;
pub use types::*;
pub use zone::{SpatialGrid, Zone};
