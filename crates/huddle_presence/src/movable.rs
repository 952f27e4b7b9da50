//! The capability shared by everything the position notifier can track.

use crate::types::{CharacterLayer, GroupId, Point, PointPosition, SessionId};
use serde::Serialize;
use uuid::Uuid;

/// Stable key of a tracked movable.
///
/// Participants sort before groups, then by id, so sets of keys iterate in a
/// deterministic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MovableKey {
    Participant(SessionId),
    Group(GroupId),
}

/// Anything with a 2D position that can be tracked in the zone grid.
pub trait Movable {
    /// Key under which the notifier tracks this movable.
    fn key(&self) -> MovableKey;

    /// Current position in world units.
    fn position(&self) -> Point;

    /// Outbound view of this movable, attached to every zone event about it.
    fn snapshot(&self) -> MovableSnapshot;
}

/// What zone listeners learn about a participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSnapshot {
    pub session_id: SessionId,
    pub uuid: Uuid,
    pub name: String,
    pub position: PointPosition,
    pub character_layers: Vec<CharacterLayer>,
    pub companion: Option<String>,
}

/// What zone listeners learn about a group bubble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub group_id: GroupId,
    pub position: Point,
    pub member_count: usize,
}

/// Point-in-time view of a movable, as carried by [`crate::ZoneEvent`]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MovableSnapshot {
    Participant(ParticipantSnapshot),
    Group(GroupSnapshot),
}

impl MovableSnapshot {
    pub fn key(&self) -> MovableKey {
        match self {
            MovableSnapshot::Participant(p) => MovableKey::Participant(p.session_id),
            MovableSnapshot::Group(g) => MovableKey::Group(g.group_id),
        }
    }

    pub fn position(&self) -> Point {
        match self {
            MovableSnapshot::Participant(p) => p.position.point(),
            MovableSnapshot::Group(g) => g.position,
        }
    }
}
