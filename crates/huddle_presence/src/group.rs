//! Proximity groups: participants close enough to talk to each other.
//!
//! A group keeps an ordered list of member session ids and the centroid of
//! their positions. It is itself a [`Movable`], so listeners see group bubbles
//! enter and leave their area just like participants.
//!
//! Groups never own participants. Membership is mirrored on both sides (the
//! member list here, `Participant::group` there) and every method that changes
//! membership updates both at once.

use crate::error::RoomError;
use crate::movable::{GroupSnapshot, Movable, MovableKey, MovableSnapshot};
use crate::notifier::PositionNotifier;
use crate::participant::Participant;
use crate::types::{GroupId, Point, SessionId};
use std::collections::BTreeMap;

/// A cluster of participants sharing a centroid.
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    members: Vec<SessionId>,
    max_size: usize,
    position: Point,
}

impl Group {
    pub(crate) fn new(id: GroupId, max_size: usize) -> Self {
        Self {
            id,
            members: Vec::new(),
            max_size,
            position: Point::default(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Members in the order they joined.
    pub fn members(&self) -> &[SessionId] {
        &self.members
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.members.contains(&session)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether the group reached its configured maximum size.
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_size
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current centroid of the members.
    pub fn centroid(&self) -> Point {
        self.position
    }

    /// Creates a group around its founding pair and publishes it once both
    /// members are in, so no listener ever sees a one-member group.
    pub(crate) fn found(
        id: GroupId,
        max_size: usize,
        founders: [SessionId; 2],
        participants: &mut BTreeMap<SessionId, Participant>,
        notifier: &mut PositionNotifier,
    ) -> Result<Self, RoomError> {
        let mut group = Self::new(id, max_size);
        for session in founders {
            group.admit(session, participants)?;
        }
        group.update_position(participants, notifier);
        Ok(group)
    }

    /// Adds a participant, recomputes the centroid and publishes the group's
    /// new position.
    pub fn join(
        &mut self,
        session: SessionId,
        participants: &mut BTreeMap<SessionId, Participant>,
        notifier: &mut PositionNotifier,
    ) -> Result<(), RoomError> {
        self.admit(session, participants)?;
        self.update_position(participants, notifier);
        Ok(())
    }

    fn admit(
        &mut self,
        session: SessionId,
        participants: &mut BTreeMap<SessionId, Participant>,
    ) -> Result<(), RoomError> {
        if self.is_full() {
            return Err(RoomError::GroupFull(self.id));
        }
        let participant = participants.get_mut(&session).ok_or_else(|| {
            RoomError::InvariantViolation(format!(
                "participant {session} joining {} is not in the room",
                self.id
            ))
        })?;
        if let Some(current) = participant.group {
            if current != self.id {
                return Err(RoomError::InvariantViolation(format!(
                    "participant {session} joining {} already belongs to {current}",
                    self.id
                )));
            }
        }

        participant.group = Some(self.id);
        if !self.members.contains(&session) {
            self.members.push(session);
        }
        Ok(())
    }

    /// Removes a participant from the member list and clears its group
    /// reference. Returns `false` if it was not a member.
    ///
    /// The caller decides whether the group survives and refreshes the
    /// centroid or destroys the group accordingly.
    pub fn leave(&mut self, participant: &mut Participant) -> bool {
        let Some(index) = self.members.iter().position(|m| *m == participant.id()) else {
            return false;
        };
        self.members.remove(index);
        if participant.group == Some(self.id) {
            participant.group = None;
        }
        true
    }

    /// Recomputes the centroid from the members' current positions and
    /// publishes it.
    pub fn update_position(
        &mut self,
        participants: &BTreeMap<SessionId, Participant>,
        notifier: &mut PositionNotifier,
    ) {
        let points: Vec<Point> = self
            .members
            .iter()
            .filter_map(|id| participants.get(id))
            .map(|p| p.point_position().point())
            .collect();
        if points.is_empty() {
            return;
        }

        let count = points.len() as f64;
        let (sum_x, sum_y) = points.iter().fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
        self.position = Point::new(sum_x / count, sum_y / count);
        notifier.set_position(self);
    }

    /// Releases every remaining member and withdraws the group from the zone
    /// grid. Returns the sessions that were released.
    pub fn destroy(
        mut self,
        participants: &mut BTreeMap<SessionId, Participant>,
        notifier: &mut PositionNotifier,
    ) -> Vec<SessionId> {
        notifier.remove_movable(&self);

        let released: Vec<SessionId> = self.members.drain(..).collect();
        for session in &released {
            if let Some(participant) = participants.get_mut(session) {
                if participant.group == Some(self.id) {
                    participant.group = None;
                }
            }
        }
        released
    }
}

impl Movable for Group {
    fn key(&self) -> MovableKey {
        MovableKey::Group(self.id)
    }

    fn position(&self) -> Point {
        self.position
    }

    fn snapshot(&self) -> MovableSnapshot {
        MovableSnapshot::Group(GroupSnapshot {
            group_id: self.id,
            position: self.position,
            member_count: self.members.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::JoinRequest;
    use crate::types::{ConnectionId, PointPosition};

    fn roster(points: &[(f64, f64)]) -> BTreeMap<SessionId, Participant> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let id = SessionId(i as u64 + 1);
                let position = PointPosition::new(x, y);
                let request = JoinRequest::new(format!("p{}", id), position);
                (id, Participant::new(id, ConnectionId(id.0), position, request))
            })
            .collect()
    }

    #[test]
    fn test_centroid_is_mean_of_members() {
        let mut participants = roster(&[(0.0, 0.0), (100.0, 0.0), (50.0, 90.0)]);
        let mut notifier = PositionNotifier::new(320.0, 320.0);
        let mut group = Group::new(GroupId(1), 4);

        group.join(SessionId(1), &mut participants, &mut notifier).unwrap();
        group.join(SessionId(2), &mut participants, &mut notifier).unwrap();
        assert_eq!(group.centroid(), Point::new(50.0, 0.0));

        group.join(SessionId(3), &mut participants, &mut notifier).unwrap();
        assert_eq!(group.centroid(), Point::new(50.0, 30.0));
        assert_eq!(group.members(), &[SessionId(1), SessionId(2), SessionId(3)]);
        assert_eq!(participants[&SessionId(3)].group(), Some(GroupId(1)));
        assert_eq!(notifier.zone_of(group.key()), Some(crate::types::ZoneCoord::new(0, 0)));
    }

    #[test]
    fn test_join_fails_when_full() {
        let mut participants = roster(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let mut notifier = PositionNotifier::new(320.0, 320.0);
        let mut group = Group::new(GroupId(1), 2);

        group.join(SessionId(1), &mut participants, &mut notifier).unwrap();
        group.join(SessionId(2), &mut participants, &mut notifier).unwrap();
        assert!(group.is_full());
        assert_eq!(
            group.join(SessionId(3), &mut participants, &mut notifier),
            Err(RoomError::GroupFull(GroupId(1)))
        );
        assert!(!participants[&SessionId(3)].is_grouped());
    }

    #[test]
    fn test_leave_and_destroy_release_members() {
        let mut participants = roster(&[(0.0, 0.0), (10.0, 0.0)]);
        let mut notifier = PositionNotifier::new(320.0, 320.0);
        let mut group = Group::new(GroupId(5), 4);
        group.join(SessionId(1), &mut participants, &mut notifier).unwrap();
        group.join(SessionId(2), &mut participants, &mut notifier).unwrap();

        let first = participants.get_mut(&SessionId(1)).unwrap();
        assert!(group.leave(first));
        assert!(!group.leave(first));
        assert!(!participants[&SessionId(1)].is_grouped());
        assert_eq!(group.len(), 1);

        let released = group.destroy(&mut participants, &mut notifier);
        assert_eq!(released, vec![SessionId(2)]);
        assert!(!participants[&SessionId(2)].is_grouped());
        assert_eq!(notifier.zone_of(MovableKey::Group(GroupId(5))), None);
    }

    #[test]
    fn test_found_publishes_pair_once() {
        let mut participants = roster(&[(0.0, 0.0), (40.0, 0.0)]);
        let mut notifier = PositionNotifier::new(320.0, 320.0);
        let (listener, mut rx) = crate::events::ZoneListener::channel(crate::types::ListenerId(1));
        notifier.add_listener(listener, 0.0, 0.0);

        let group = Group::found(
            GroupId(2),
            4,
            [SessionId(1), SessionId(2)],
            &mut participants,
            &mut notifier,
        )
        .unwrap();
        assert_eq!(group.centroid(), Point::new(20.0, 0.0));

        let event = rx.try_recv().unwrap();
        match event.movable() {
            MovableSnapshot::Group(snapshot) => assert_eq!(snapshot.member_count, 2),
            other => panic!("unexpected snapshot {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unknown_member_is_an_invariant_violation() {
        let mut participants = roster(&[(0.0, 0.0)]);
        let mut notifier = PositionNotifier::new(320.0, 320.0);
        let mut group = Group::new(GroupId(1), 4);
        let result = group.join(SessionId(99), &mut participants, &mut notifier);
        assert!(matches!(result, Err(RoomError::InvariantViolation(_))));
        assert!(group.is_empty());
    }
}
