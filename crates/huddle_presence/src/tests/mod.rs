//! Scenario tests for the presence engine
//!
//! - Group formation and dissolution as participants walk around
//! - Join/leave bookkeeping and admin notifications
//! - Zone listener views and event ordering
//! - Structural invariants checked after every step of a longer walk
//! - Rejection of unusable coordinates and behaviour at the edges of the map






use crate::*;
use tokio::sync::mpsc::UnboundedReceiver;

pub(crate) fn proximity(min_distance: f64, group_radius: f64) -> ProximityConfig {
    ProximityConfig {
        min_distance,
        group_radius,
        ..ProximityConfig::default()
    }
}

pub(crate) fn join_at(room: &mut GameRoom, name: &str, x: f64, y: f64) -> SessionId {
    let connection = ConnectionId(room.participant_count() as u64 + 100);
    room.join(connection, JoinRequest::new(name, PointPosition::new(x, y)))
        .expect("join should succeed")
        .id()
}

pub(crate) fn move_to(room: &mut GameRoom, session: SessionId, x: f64, y: f64) {
    room.update_position(session, PointPosition::new(x, y))
        .expect("position update should succeed");
}

pub(crate) fn drain<T>(receiver: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Checks every structural invariant of a room.
pub(crate) fn assert_consistent(room: &GameRoom) {
    for participant in room.participants() {
        let position = participant.point_position();
        assert_eq!(
            room.zone_of(participant.key()),
            Some(room.zone_coord(position.x, position.y)),
            "participant {} is registered in the wrong zone",
            participant.id()
        );

        if let Some(group_id) = participant.group() {
            let group = room.group(group_id).expect("referenced group must exist");
            assert!(group.contains(participant.id()));
        }
        let memberships = room.groups().filter(|g| g.contains(participant.id())).count();
        assert!(memberships <= 1, "participant {} is in {} groups", participant.id(), memberships);
    }

    for group in room.groups() {
        assert!(group.len() >= 2, "{} has {} members", group.id(), group.len());
        assert!(group.len() <= group.max_size());

        let count = group.len() as f64;
        let (sum_x, sum_y) = group.members().iter().fold((0.0, 0.0), |(x, y), id| {
            let p = room.participant(*id).expect("member must be in the room").point_position();
            assert_eq!(room.participant(*id).and_then(Participant::group), Some(group.id()));
            (x + p.x, y + p.y)
        });
        let centroid = group.centroid();
        assert!((centroid.x - sum_x / count).abs() < 1e-9);
        assert!((centroid.y - sum_y / count).abs() < 1e-9);
        assert_eq!(room.zone_of(group.key()), Some(room.zone_coord(centroid.x, centroid.y)));
    }
}
