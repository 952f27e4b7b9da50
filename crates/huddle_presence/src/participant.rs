//! Participants: the people connected to a room.

use crate::movable::{Movable, MovableKey, MovableSnapshot, ParticipantSnapshot};
use crate::types::{CharacterLayer, ConnectionId, GroupId, Point, PointPosition, SessionId};
use serde::Deserialize;
use uuid::Uuid;

/// Validated identity and appearance handed over by the transport on join.
///
/// `position` is optional on the wire; a request without it is rejected by
/// [`crate::GameRoom::join`].
#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub uuid: Uuid,
    pub ip_address: String,
    #[serde(default)]
    pub position: Option<PointPosition>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub character_layers: Vec<CharacterLayer>,
    #[serde(default)]
    pub companion: Option<String>,
}

impl JoinRequest {
    /// A request with a fresh uuid, a loopback address and no tags or layers.
    pub fn new(name: impl Into<String>, position: PointPosition) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            ip_address: "127.0.0.1".to_string(),
            position: Some(position),
            tags: Vec::new(),
            name: name.into(),
            character_layers: Vec::new(),
            companion: None,
        }
    }
}

/// A participant inside one room.
///
/// The group reference is a plain id: the room owns every group, and a
/// participant only remembers which one it belongs to.
#[derive(Debug, Clone)]
pub struct Participant {
    id: SessionId,
    uuid: Uuid,
    ip_address: String,
    connection: ConnectionId,
    position: PointPosition,
    silent: bool,
    pub(crate) group: Option<GroupId>,
    pub tags: Vec<String>,
    pub name: String,
    pub character_layers: Vec<CharacterLayer>,
    pub companion: Option<String>,
}

impl Participant {
    pub(crate) fn new(
        id: SessionId,
        connection: ConnectionId,
        position: PointPosition,
        request: JoinRequest,
    ) -> Self {
        Self {
            id,
            uuid: request.uuid,
            ip_address: request.ip_address,
            connection,
            position,
            silent: false,
            group: None,
            tags: request.tags,
            name: request.name,
            character_layers: request.character_layers,
            companion: request.companion,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn point_position(&self) -> PointPosition {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: PointPosition) {
        self.position = position;
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub(crate) fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// The group this participant currently belongs to.
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }
}

impl Movable for Participant {
    fn key(&self) -> MovableKey {
        MovableKey::Participant(self.id)
    }

    fn position(&self) -> Point {
        self.position.point()
    }

    fn snapshot(&self) -> MovableSnapshot {
        MovableSnapshot::Participant(ParticipantSnapshot {
            session_id: self.id,
            uuid: self.uuid,
            name: self.name.clone(),
            position: self.position,
            character_layers: self.character_layers.clone(),
            companion: self.companion.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_request_deserializes_without_optional_fields() {
        let request: JoinRequest = serde_json::from_str(
            r#"{
                "uuid": "550e8400-e29b-41d4-a716-446655440000",
                "ip_address": "10.1.2.3",
                "name": "Alice"
            }"#,
        )
        .unwrap();
        assert!(request.position.is_none());
        assert!(request.tags.is_empty());
        assert!(request.character_layers.is_empty());
        assert!(request.companion.is_none());
    }

    #[test]
    fn test_participant_snapshot() {
        let mut request = JoinRequest::new("Bob", PointPosition::new(12.0, 34.0));
        request.character_layers.push(CharacterLayer::new("male1"));
        request.companion = Some("dog1".to_string());
        let uuid = request.uuid;

        let participant = Participant::new(SessionId(3), ConnectionId(8), PointPosition::new(12.0, 34.0), request);
        assert_eq!(participant.key(), MovableKey::Participant(SessionId(3)));
        assert_eq!(participant.position(), Point::new(12.0, 34.0));
        assert!(!participant.is_grouped());

        match participant.snapshot() {
            MovableSnapshot::Participant(snapshot) => {
                assert_eq!(snapshot.uuid, uuid);
                assert_eq!(snapshot.name, "Bob");
                assert_eq!(snapshot.character_layers, vec![CharacterLayer::new("male1")]);
                assert_eq!(snapshot.companion.as_deref(), Some("dog1"));
            }
            other => panic!("unexpected snapshot {other:?}"),
        }
    }
}
