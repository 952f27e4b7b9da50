//! # Game Room
//!
//! One isolated shared space. The room owns its participants, its groups, the
//! admin sessions watching it and the [`PositionNotifier`] that fans zone
//! events out to listeners. Every position change runs the proximity
//! algorithm:
//!
//! * an ungrouped, non-silent participant that is standing still looks for the
//!   closest lone participant within `min_distance` or non-full group within
//!   `group_radius`, and either founds a new group with the former or joins the
//!   latter;
//! * a grouped participant further than `group_radius` from its group centroid
//!   leaves the group, and a group left with fewer than two members is
//!   dissolved on the spot.
//!
//! A room is a plain `&mut self` state machine. Serializing access (one
//! operation at a time) is the caller's business.

use crate::config::ProximityConfig;
use crate::error::{RoomError, RoomIdError};
use crate::events::{AdminSession, GroupEvent, GroupEventSender, ZoneListener};
use crate::group::Group;
use crate::movable::{Movable, MovableKey, MovableSnapshot};
use crate::notifier::PositionNotifier;
use crate::participant::{JoinRequest, Participant};
use crate::room_id::RoomIdentifier;
use crate::types::{
    AdminSessionId, ConnectionId, GroupId, ItemId, ListenerId, Point, PointPosition, SessionId,
    ZoneCoord,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Best target found by the closest-candidate search.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ClosestCandidate {
    Participant(SessionId),
    Group(GroupId),
}

/// Point-in-time counters for one room.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoomStats {
    pub participants: usize,
    pub groups: usize,
    pub grouped_participants: usize,
    pub admins: usize,
    pub zones: usize,
    pub listeners: usize,
    pub version: u64,
    pub poisoned: bool,
}

/// The presence engine of one room.
#[derive(Debug)]
pub struct GameRoom {
    room_id: String,
    config: ProximityConfig,
    participants: BTreeMap<SessionId, Participant>,
    by_uuid: HashMap<Uuid, SessionId>,
    groups: BTreeMap<GroupId, Group>,
    admins: BTreeMap<AdminSessionId, AdminSession>,
    notifier: PositionNotifier,
    items: BTreeMap<ItemId, serde_json::Value>,
    group_events: Option<GroupEventSender>,
    next_session: u64,
    next_group: u64,
    version: u64,
    poisoned: Option<String>,
}

impl GameRoom {
    pub fn new(room_id: impl Into<String>, config: ProximityConfig) -> Self {
        let room_id = room_id.into();
        let notifier = PositionNotifier::new(config.zone_width, config.zone_height);
        info!("🏠 Room {} created", room_id);
        Self {
            room_id,
            config,
            participants: BTreeMap::new(),
            by_uuid: HashMap::new(),
            groups: BTreeMap::new(),
            admins: BTreeMap::new(),
            notifier,
            items: BTreeMap::new(),
            group_events: None,
            next_session: 1,
            next_group: 1,
            version: 1,
            poisoned: None,
        }
    }

    /// Routes group membership changes to `sender`.
    pub fn with_group_events(mut self, sender: GroupEventSender) -> Self {
        self.group_events = Some(sender);
        self
    }

    pub fn set_group_events(&mut self, sender: Option<GroupEventSender>) {
        self.group_events = sender;
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    /// Adds a participant to the room.
    ///
    /// The request must carry a position. On success the participant is
    /// published to nearby listeners, may immediately join a group, and every
    /// admin session receives a `UserJoin`.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        request: JoinRequest,
    ) -> Result<&Participant, RoomError> {
        self.ensure_healthy()?;
        let Some(position) = request.position else {
            warn!("⚠️ Join request for {} in room {} has no position", request.uuid, self.room_id);
            return Err(RoomError::MissingPosition);
        };
        self.validate_position(position.x, position.y)?;

        let id = SessionId(self.next_session);
        self.next_session += 1;

        let participant = Participant::new(id, connection, position, request);
        if let Some(previous) = self.by_uuid.insert(participant.uuid(), id) {
            warn!(
                "⚠️ User {} joined room {} again while session {} is still present",
                participant.uuid(),
                self.room_id,
                previous
            );
        }
        self.notifier.add_movable(&participant);
        self.participants.insert(id, participant);

        let result = self.update_user_group(id);
        self.checked(result)?;

        let participant = self.participants.get(&id).ok_or_else(|| {
            RoomError::InvariantViolation(format!("participant {id} vanished while joining"))
        })?;
        for admin in self.admins.values() {
            admin.send_user_join(participant.uuid(), &participant.name, participant.ip_address());
        }
        info!(
            "👋 {} joined room {} as session {}",
            participant.name, self.room_id, id
        );
        Ok(participant)
    }

    /// Removes a participant from the room.
    ///
    /// Leaving an unknown session is tolerated so that late or duplicate
    /// signals from the transport are absorbed.
    pub fn leave(&mut self, session: SessionId) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        let Some(participant) = self.participants.get(&session) else {
            warn!("⚠️ Session {} does not belong to room {}", session, self.room_id);
            return Ok(());
        };

        if participant.is_grouped() {
            let result = self.leave_group(session);
            self.checked(result)?;
        }

        let Some(participant) = self.participants.remove(&session) else {
            return Ok(());
        };
        if self.by_uuid.get(&participant.uuid()) == Some(&session) {
            self.by_uuid.remove(&participant.uuid());
        }
        self.notifier.remove_movable(&participant);

        for admin in self.admins.values() {
            admin.send_user_left(participant.uuid());
        }
        info!("🚪 Session {} left room {}", session, self.room_id);
        Ok(())
    }

    /// Moves a participant and re-evaluates its group membership.
    pub fn update_position(
        &mut self,
        session: SessionId,
        position: PointPosition,
    ) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        self.validate_position(position.x, position.y)?;
        if !self.participants.contains_key(&session) {
            warn!("⚠️ Position update for unknown session {} in room {}", session, self.room_id);
            return Ok(());
        }
        let result = self.apply_position(session, position);
        self.checked(result)
    }

    /// Toggles the silent flag. A silent participant leaves its group and is
    /// ignored by the proximity search until the flag is cleared.
    pub fn set_silent(&mut self, session: SessionId, silent: bool) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        let Some(participant) = self.participants.get_mut(&session) else {
            warn!("⚠️ Silent toggle for unknown session {} in room {}", session, self.room_id);
            return Ok(());
        };
        if participant.is_silent() == silent {
            debug!("Session {} is already silent={}", session, silent);
            return Ok(());
        }

        participant.set_silent(silent);
        let grouped = participant.is_grouped();
        let position = participant.point_position();
        debug!("🔕 Session {} silent={} in room {}", session, silent, self.room_id);

        let result = if silent {
            if grouped {
                self.leave_group(session)
            } else {
                Ok(())
            }
        } else {
            self.apply_position(session, position)
        };
        self.checked(result)
    }

    /// Broadcasts an emote from a participant to the listeners around it.
    pub fn emit_emote(&mut self, session: SessionId, emote: &str) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        match self.participants.get(&session) {
            Some(participant) => self.notifier.emit_emote(participant, emote),
            None => warn!("⚠️ Emote from unknown session {} in room {}", session, self.room_id),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listeners and admins
    // ------------------------------------------------------------------

    /// Registers a zone listener and returns everything it can currently see.
    pub fn add_zone_listener(
        &mut self,
        listener: ZoneListener,
        x: f64,
        y: f64,
    ) -> Result<Vec<MovableSnapshot>, RoomError> {
        self.ensure_healthy()?;
        self.validate_position(x, y)?;
        let keys = self.notifier.add_listener(listener, x, y);
        Ok(keys.into_iter().filter_map(|key| self.snapshot(key)).collect())
    }

    pub fn remove_zone_listener(
        &mut self,
        listener: ListenerId,
        x: f64,
        y: f64,
    ) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        self.validate_position(x, y)?;
        self.notifier.remove_listener(listener, x, y);
        Ok(())
    }

    /// Registers an admin session and replays the current roster to it.
    pub fn admin_join(&mut self, admin: AdminSession) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        for participant in self.participants.values() {
            admin.send_user_join(participant.uuid(), &participant.name, participant.ip_address());
        }
        info!("🛡️ Admin session {:?} attached to room {}", admin.id(), self.room_id);
        self.admins.insert(admin.id(), admin);
        Ok(())
    }

    pub fn admin_leave(&mut self, admin: AdminSessionId) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        if self.admins.remove(&admin).is_some() {
            info!("🛡️ Admin session {:?} detached from room {}", admin, self.room_id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Items and versioning
    // ------------------------------------------------------------------

    pub fn set_item_state(
        &mut self,
        item: ItemId,
        state: serde_json::Value,
    ) -> Result<(), RoomError> {
        self.ensure_healthy()?;
        self.items.insert(item, state);
        Ok(())
    }

    pub fn items_state(&self) -> &BTreeMap<ItemId, serde_json::Value> {
        &self.items
    }

    /// Bumps the room version and returns the new value.
    pub fn increment_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Decomposes the room id into its anonymous or private form.
    pub fn identifier(&self) -> Result<RoomIdentifier, RoomIdError> {
        self.room_id.parse()
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub fn participant(&self, session: SessionId) -> Option<&Participant> {
        self.participants.get(&session)
    }

    pub fn participant_by_uuid(&self, uuid: Uuid) -> Option<&Participant> {
        self.by_uuid.get(&uuid).and_then(|id| self.participants.get(id))
    }

    /// Participants in join order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> + '_ {
        self.participants.values()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.groups.values()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }

    /// Zone a participant or group is currently registered in.
    pub fn zone_of(&self, key: MovableKey) -> Option<ZoneCoord> {
        self.notifier.zone_of(key)
    }

    /// Zone containing the world coordinate (x, y).
    pub fn zone_coord(&self, x: f64, y: f64) -> ZoneCoord {
        self.notifier.zone_coord(x, y)
    }

    /// A room with neither participants nor admins can be reclaimed.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.admins.is_empty()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Description of the invariant violation that poisoned the room.
    pub fn poison_reason(&self) -> Option<&str> {
        self.poisoned.as_deref()
    }

    pub fn stats(&self) -> RoomStats {
        RoomStats {
            participants: self.participants.len(),
            groups: self.groups.len(),
            grouped_participants: self.groups.values().map(Group::len).sum(),
            admins: self.admins.len(),
            zones: self.notifier.grid().zone_count(),
            listeners: self.notifier.listener_count(),
            version: self.version,
            poisoned: self.poisoned.is_some(),
        }
    }

    // ------------------------------------------------------------------
    // Proximity algorithm
    // ------------------------------------------------------------------

    fn apply_position(&mut self, session: SessionId, position: PointPosition) -> Result<(), RoomError> {
        if let Some(participant) = self.participants.get_mut(&session) {
            participant.set_position(position);
        }
        if let Some(participant) = self.participants.get(&session) {
            self.notifier.set_position(participant);
        }
        self.update_user_group(session)
    }

    fn update_user_group(&mut self, session: SessionId) -> Result<(), RoomError> {
        let Some(participant) = self.participants.get(&session) else {
            return Ok(());
        };
        let group_id = participant.group();
        let silent = participant.is_silent();
        let position = participant.point_position();

        if let Some(group_id) = group_id {
            let group = self.groups.get_mut(&group_id).ok_or_else(|| {
                RoomError::InvariantViolation(format!(
                    "could not find {group_id} referenced by participant {session}"
                ))
            })?;
            group.update_position(&self.participants, &mut self.notifier);
        }

        if silent {
            return Ok(());
        }

        match group_id {
            None => {
                // No group hopping mid-transit
                if position.moving {
                    return Ok(());
                }
                match self.search_closest_available(session, position.point()) {
                    Some(ClosestCandidate::Group(group_id)) => self.join_group(session, group_id),
                    Some(ClosestCandidate::Participant(partner)) => self.found_group(session, partner),
                    None => Ok(()),
                }
            }
            Some(group_id) => {
                let centroid = self.groups.get(&group_id).map(Group::centroid).ok_or_else(|| {
                    RoomError::InvariantViolation(format!(
                        "could not find {group_id} referenced by participant {session}"
                    ))
                })?;
                if position.point().distance(centroid) > self.config.group_radius {
                    self.leave_group(session)?;
                }
                Ok(())
            }
        }
    }

    /// Closest lone participant within `min_distance` or non-full group
    /// within `group_radius`. Only strictly closer candidates replace the
    /// current best, so ties go to the first one seen: participants by session
    /// id, then groups by group id.
    fn search_closest_available(&self, session: SessionId, from: Point) -> Option<ClosestCandidate> {
        let mut threshold = self.config.search_radius();
        let mut best: Option<ClosestCandidate> = None;

        let mut consider = |distance: f64, limit: f64, candidate: ClosestCandidate| {
            let within = match best {
                None => distance <= threshold,
                Some(_) => distance < threshold,
            };
            if within && distance <= limit {
                threshold = distance;
                best = Some(candidate);
            }
        };

        for (id, other) in &self.participants {
            if *id == session || other.is_grouped() || other.is_silent() {
                continue;
            }
            let distance = from.distance(other.point_position().point());
            consider(distance, self.config.min_distance, ClosestCandidate::Participant(*id));
        }

        for (id, group) in &self.groups {
            if group.is_full() {
                continue;
            }
            let distance = from.distance(group.centroid());
            consider(distance, self.config.group_radius, ClosestCandidate::Group(*id));
        }

        best
    }

    fn found_group(&mut self, session: SessionId, partner: SessionId) -> Result<(), RoomError> {
        let id = GroupId(self.next_group);
        self.next_group += 1;

        let group = Group::found(
            id,
            self.config.max_group_size,
            [session, partner],
            &mut self.participants,
            &mut self.notifier,
        )?;
        self.groups.insert(id, group);
        info!("👥 {} formed in room {} by sessions {} and {}", id, self.room_id, session, partner);

        self.send_joined(id, session);
        self.send_joined(id, partner);
        Ok(())
    }

    fn join_group(&mut self, session: SessionId, group_id: GroupId) -> Result<(), RoomError> {
        let group = self.groups.get_mut(&group_id).ok_or_else(|| {
            RoomError::InvariantViolation(format!("candidate {group_id} is not held by the room"))
        })?;
        group.join(session, &mut self.participants, &mut self.notifier)?;
        debug!("➕ Session {} joined {} in room {}", session, group_id, self.room_id);
        self.send_joined(group_id, session);
        Ok(())
    }

    /// Takes a participant out of its group and dissolves the group if fewer
    /// than two members remain.
    fn leave_group(&mut self, session: SessionId) -> Result<(), RoomError> {
        let participant = self.participants.get_mut(&session).ok_or_else(|| {
            RoomError::InvariantViolation(format!("participant {session} is not in the room"))
        })?;
        let group_id = participant.group().ok_or_else(|| {
            RoomError::InvariantViolation(format!("participant {session} is part of no group"))
        })?;
        let group = self.groups.get_mut(&group_id).ok_or_else(|| {
            RoomError::InvariantViolation(format!(
                "could not find {group_id} referenced by participant {session}"
            ))
        })?;

        group.leave(participant);
        let connection = participant.connection();
        let remaining = group.len();
        self.send_group_event(GroupEvent::Left {
            group_id,
            session_id: session,
            connection,
        });

        if remaining >= 2 {
            if let Some(group) = self.groups.get_mut(&group_id) {
                group.update_position(&self.participants, &mut self.notifier);
            }
            debug!("➖ Session {} left {} in room {}", session, group_id, self.room_id);
            return Ok(());
        }

        if let Some(group) = self.groups.remove(&group_id) {
            let released = group.destroy(&mut self.participants, &mut self.notifier);
            for member in released {
                if let Some(connection) = self.participants.get(&member).map(Participant::connection) {
                    self.send_group_event(GroupEvent::Left {
                        group_id,
                        session_id: member,
                        connection,
                    });
                }
            }
            info!("💨 {} dissolved in room {}", group_id, self.room_id);
        }
        Ok(())
    }

    fn send_joined(&self, group_id: GroupId, session: SessionId) {
        if let Some(participant) = self.participants.get(&session) {
            self.send_group_event(GroupEvent::Joined {
                group_id,
                session_id: session,
                connection: participant.connection(),
            });
        }
    }

    fn send_group_event(&self, event: GroupEvent) {
        if let Some(sender) = &self.group_events {
            if sender.send(event).is_err() {
                debug!("Group event receiver for room {} is closed", self.room_id);
            }
        }
    }

    fn snapshot(&self, key: MovableKey) -> Option<MovableSnapshot> {
        match key {
            MovableKey::Participant(id) => self.participants.get(&id).map(Movable::snapshot),
            MovableKey::Group(id) => self.groups.get(&id).map(Movable::snapshot),
        }
    }

    // ------------------------------------------------------------------
    // Poisoning
    // ------------------------------------------------------------------

    /// Rejects coordinates that are not finite or lie beyond
    /// [`MAX_COORDINATE`](crate::types::MAX_COORDINATE).
    fn validate_position(&self, x: f64, y: f64) -> Result<(), RoomError> {
        if Point::new(x, y).is_within_bounds() {
            return Ok(());
        }
        warn!("⚠️ Rejected position ({}, {}) in room {}", x, y, self.room_id);
        Err(RoomError::InvalidPosition {
            x: x.to_string(),
            y: y.to_string(),
        })
    }

    fn ensure_healthy(&self) -> Result<(), RoomError> {
        match self.poisoned {
            Some(_) => Err(RoomError::Poisoned(self.room_id.clone())),
            None => Ok(()),
        }
    }

    /// Poisons the room when `result` carries an invariant violation.
    fn checked<T>(&mut self, result: Result<T, RoomError>) -> Result<T, RoomError> {
        if let Err(RoomError::InvariantViolation(reason)) = &result {
            error!("💥 Room {} poisoned: {}", self.room_id, reason);
            self.poisoned = Some(reason.clone());
        }
        result
    }
}
