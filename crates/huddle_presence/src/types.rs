//! # Core Type Definitions
//!
//! Identifiers and geometry shared by every part of the presence engine.
//!
//! ## Key Types
//!
//! - [`SessionId`] - Room-scoped participant identifier, never reused
//! - [`GroupId`] - Room-scoped group identifier
//! - [`PointPosition`] - Participant position as reported by the client
//! - [`Point`] - Plain 2D coordinate (group centroids)
//! - [`ZoneCoord`] - Grid cell used to route notifications
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent ID confusion (SessionId vs GroupId)
//! - **Serialization**: All types support JSON serialization for the transport layer
//! - **Determinism**: IDs are ordered so map iteration follows creation order

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a participant inside one room.
///
/// Session ids are assigned sequentially by the room, starting at 1, and are
/// never handed out twice for the lifetime of the room. Because they only grow,
/// ordering by `SessionId` is the same as ordering by join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a proximity group inside one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Opaque handle of the transport connection a participant joined with.
///
/// The core never interprets it; it is echoed back in group notifications so
/// the transport knows which socket to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

/// Identifier of a zone listener (one viewport subscription of a transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// Identifier of an attached admin session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdminSessionId(pub u64);

/// Key of an entry in the room's generic item state store.
pub type ItemId = u64;

// ============================================================================
// Geometry
// ============================================================================

/// Facing direction reported by the client alongside its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

/// A participant's position as sent by the client.
///
/// The `moving` flag is set while the avatar is walking; the room does not
/// try to form groups for participants in motion.
///
/// # Examples
///
/// ```rust
/// use huddle_presence::{Direction, PointPosition};
///
/// let spawn = PointPosition::new(0.0, 0.0);
/// let walking = PointPosition::moving(120.0, 40.0, Direction::Left);
/// assert!(walking.moving && !spawn.moving);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub moving: bool,
}

impl PointPosition {
    /// Creates a resting position facing down.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            direction: Direction::Down,
            moving: false,
        }
    }

    /// Creates a position for an avatar currently walking.
    pub fn moving(x: f64, y: f64, direction: Direction) -> Self {
        Self {
            x,
            y,
            direction,
            moving: true,
        }
    }

    /// The bare coordinate of this position.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_within_bounds(&self) -> bool {
        self.point().is_within_bounds()
    }
}

/// Largest absolute coordinate a room accepts on either axis.
pub const MAX_COORDINATE: f64 = 1.0e9;

/// A plain 2D coordinate in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates are finite and no further than
    /// [`MAX_COORDINATE`] from the origin on their axis.
    pub fn is_within_bounds(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.x.abs() <= MAX_COORDINATE
            && self.y.abs() <= MAX_COORDINATE
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Integer coordinate of a zone in the notification grid.
///
/// Derived by floor-dividing world coordinates by the zone size, so negative
/// coordinates land in negative zones (`-1.0 / 320.0` is zone `-1`, not `0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneCoord {
    pub x: i64,
    pub y: i64,
}

impl ZoneCoord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The zone itself plus its 8 neighbours, row by row.
    ///
    /// At the edge of the `i64` range the block is clipped rather than
    /// wrapped, so fewer than 9 zones come back.
    pub fn neighborhood(&self) -> SmallVec<[ZoneCoord; 9]> {
        let mut zones: SmallVec<[ZoneCoord; 9]> = SmallVec::new();
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                let (Some(x), Some(y)) = (self.x.checked_add(dx), self.y.checked_add(dy)) else {
                    continue;
                };
                zones.push(ZoneCoord::new(x, y));
            }
        }
        zones
    }

    /// Whether `other` lies in the 3x3 neighbourhood of this zone.
    pub fn is_adjacent(&self, other: ZoneCoord) -> bool {
        self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }
}

impl std::fmt::Display for ZoneCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Participant attributes
// ============================================================================

/// One layer of a participant's layered avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterLayer {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl CharacterLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }
}
