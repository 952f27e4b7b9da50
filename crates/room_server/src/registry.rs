//! # Room Registry
//!
//! Explicitly owned table of live rooms. Each room sits behind its own
//! `tokio::sync::Mutex`, so operations on one room are totally ordered while
//! different rooms run in parallel.
//!
//! Map guards are never held across an `.await`: lookups clone the room
//! handle out of the map first and lock it afterwards.

use crate::config::ServerConfig;
use crate::error::ServerError;
use dashmap::DashMap;
use huddle_presence::{
    AdminSession, ConnectionId, GameRoom, GroupEventSender, JoinRequest, MovableSnapshot,
    RoomIdentifier, SessionId, ShutdownState, ZoneListener,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Shared handle to one room.
pub type SharedRoom = Arc<Mutex<GameRoom>>;

/// Aggregated counters over every live room.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryStats {
    pub rooms: usize,
    pub participants: usize,
    pub groups: usize,
    pub admins: usize,
    pub listeners: usize,
    pub poisoned_rooms: usize,
}

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: DashMap<String, SharedRoom>,
    config: ServerConfig,
    group_events: Option<GroupEventSender>,
    shutdown: ShutdownState,
}

impl RoomRegistry {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
            group_events: None,
            shutdown: ShutdownState::new(),
        }
    }

    /// Every room created from now on reports group membership changes to
    /// `sender`.
    /// Like [`RoomRegistry::new`], but refuses an invalid configuration.
    pub fn try_new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;
        Ok(Self::new(config))
    }

    pub fn with_group_events(mut self, sender: GroupEventSender) -> Self {
        self.group_events = Some(sender);
        self
    }

    pub fn with_shutdown_state(mut self, shutdown: ShutdownState) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the room registered under `room_id`, creating it first if
    /// needed.
    pub fn create_room(&self, room_id: &str) -> Result<SharedRoom, ServerError> {
        if let Some(room) = self.room(room_id) {
            return Ok(room);
        }
        if self.shutdown.is_draining() {
            return Err(ServerError::Internal(format!(
                "refusing to create room {room_id} during shutdown"
            )));
        }
        room_id.parse::<RoomIdentifier>()?;

        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                let mut room = GameRoom::new(room_id, self.config.proximity.clone());
                room.set_group_events(self.group_events.clone());
                Arc::new(Mutex::new(room))
            })
            .clone();
        Ok(room)
    }

    pub fn room(&self, room_id: &str) -> Option<SharedRoom> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Joins a participant, creating the room if needed.
    pub async fn join(
        &self,
        room_id: &str,
        connection: ConnectionId,
        request: JoinRequest,
    ) -> Result<SessionId, ServerError> {
        let mut room = self.lock_registered(room_id).await?;
        let participant = room.join(connection, request)?;
        Ok(participant.id())
    }

    /// Attaches an admin session, creating the room if needed.
    pub async fn admin_join(&self, room_id: &str, admin: AdminSession) -> Result<(), ServerError> {
        let mut room = self.lock_registered(room_id).await?;
        room.admin_join(admin)?;
        Ok(())
    }

    /// Registers a zone listener, creating the room if needed, and returns
    /// what it can currently see.
    pub async fn add_zone_listener(
        &self,
        room_id: &str,
        listener: ZoneListener,
        x: f64,
        y: f64,
    ) -> Result<Vec<MovableSnapshot>, ServerError> {
        let mut room = self.lock_registered(room_id).await?;
        Ok(room.add_zone_listener(listener, x, y)?)
    }

    /// Runs `operation` on a room while holding its lock. Returns `None` if
    /// no such room is registered.
    pub async fn with_room<T, F>(&self, room_id: &str, operation: F) -> Option<T>
    where
        F: FnOnce(&mut GameRoom) -> T,
    {
        loop {
            let room = self.room(room_id)?;
            let mut guard = room.lock().await;
            if self.is_registered(room_id, &room) {
                return Some(operation(&mut guard));
            }
            debug!("Room {} was reaped while waiting for its lock", room_id);
        }
    }

    /// Drops the room if it has neither participants nor admins, or if an
    /// invariant violation poisoned it. Returns `true` if it was removed.
    pub async fn destroy_room_when_empty(&self, room_id: &str) -> bool {
        let Some(room) = self.room(room_id) else {
            return false;
        };

        let guard = room.lock().await;
        let poisoned = guard.is_poisoned();
        if !(guard.is_empty() || poisoned) {
            return false;
        }

        let removed = self
            .rooms
            .remove_if(room_id, |_, registered| Arc::ptr_eq(registered, &room))
            .is_some();
        if removed {
            if poisoned {
                warn!(
                    "☣️ Reaped poisoned room {}: {}",
                    room_id,
                    guard.poison_reason().unwrap_or("unknown invariant violation")
                );
            } else {
                info!("🧹 Room {} is empty and has been released", room_id);
            }
        }
        removed
    }

    /// Releases every empty or poisoned room. Returns how many were removed.
    pub async fn reap_empty_rooms(&self) -> usize {
        let mut reaped = 0;
        for room_id in self.room_ids() {
            if self.destroy_room_when_empty(&room_id).await {
                reaped += 1;
            }
        }
        if reaped > 0 {
            debug!("🧹 Reaped {} room(s), {} still live", reaped, self.rooms.len());
        }
        reaped
    }

    pub async fn stats(&self) -> RegistryStats {
        let handles: Vec<SharedRoom> = self.rooms.iter().map(|entry| entry.value().clone()).collect();
        let mut stats = RegistryStats {
            rooms: handles.len(),
            ..RegistryStats::default()
        };
        for room in handles {
            let room_stats = room.lock().await.stats();
            stats.participants += room_stats.participants;
            stats.groups += room_stats.groups;
            stats.admins += room_stats.admins;
            stats.listeners += room_stats.listeners;
            if room_stats.poisoned {
                stats.poisoned_rooms += 1;
            }
        }
        stats
    }

    /// Stops admitting participants and releases every room.
    pub fn shutdown(&self) {
        self.shutdown.begin_drain();
        let count = self.rooms.len();
        self.rooms.clear();
        info!("🏁 Released {} room(s)", count);
        self.shutdown.mark_drained();
    }

    pub fn shutdown_state(&self) -> &ShutdownState {
        &self.shutdown
    }

    /// Locks the room registered under `room_id`, creating it if needed.
    ///
    /// A room handle can be reaped between the lookup and the lock. The lookup
    /// is then retried, so callers never act on a room that is no longer
    /// registered.
    async fn lock_registered(&self, room_id: &str) -> Result<OwnedMutexGuard<GameRoom>, ServerError> {
        loop {
            if self.shutdown.is_draining() {
                return Err(ServerError::Internal("server is shutting down".to_string()));
            }
            let room = self.create_room(room_id)?;
            let guard = Arc::clone(&room).lock_owned().await;
            if self.is_registered(room_id, &room) {
                return Ok(guard);
            }
            debug!("Room {} was reaped while waiting for its lock, retrying", room_id);
        }
    }

    fn is_registered(&self, room_id: &str, room: &SharedRoom) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), room))
    }
}
