//! # Position Notifier
//!
//! Tracks which zone every movable sits in and tells interested listeners
//! about it. A listener registered on zone `Z` sees every movable located in
//! the 3x3 neighbourhood of `Z`; symmetrically, an update about a movable in
//! zone `M` reaches every listener registered in the neighbourhood of `M`.
//! The extra ring of zones lets clients pre-load what is just off screen.
//!
//! ## Transition rules
//!
//! When a movable goes from zone `O` to zone `N`, each listener receives
//! exactly one event:
//!
//! | listener registered around | event   |
//! |----------------------------|---------|
//! | `O` only                   | `Leave` |
//! | `N` only                   | `Enter` |
//! | both                       | `Move`  |
//!
//! Events are pushed synchronously, in ascending listener id order, so a
//! listener observes the updates of one movable in the order they were applied.

use crate::events::{ZoneEvent, ZoneListener};
use crate::movable::{Movable, MovableKey, MovableSnapshot};
use crate::types::{ListenerId, ZoneCoord};
use crate::zone::SpatialGrid;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug)]
struct RegisteredListener {
    handle: ZoneListener,
    /// Number of zones this listener is registered on
    registrations: usize,
}

/// Zone bookkeeping and event fan-out for one room.
#[derive(Debug)]
pub struct PositionNotifier {
    grid: SpatialGrid,
    locations: HashMap<MovableKey, ZoneCoord>,
    listeners: HashMap<ListenerId, RegisteredListener>,
}

impl PositionNotifier {
    pub fn new(zone_width: f64, zone_height: f64) -> Self {
        Self {
            grid: SpatialGrid::new(zone_width, zone_height),
            locations: HashMap::new(),
            listeners: HashMap::new(),
        }
    }

    /// Registers `listener` on the zone containing (x, y).
    ///
    /// Returns the keys of every movable currently visible from that zone so
    /// the caller can bootstrap its view without waiting for further events.
    pub fn add_listener(&mut self, listener: ZoneListener, x: f64, y: f64) -> Vec<MovableKey> {
        let coord = self.grid.zone_coord(x, y);
        let id = listener.id();

        if self.grid.insert_listener(coord, id) {
            let entry = self.listeners.entry(id).or_insert(RegisteredListener {
                handle: listener.clone(),
                registrations: 0,
            });
            entry.handle = listener;
            entry.registrations += 1;
            debug!("👂 Listener {:?} registered on zone {}", id, coord);
        }

        self.grid.movables_around(coord)
    }

    /// Deregisters `listener` from the zone containing (x, y). Unknown
    /// registrations are ignored.
    pub fn remove_listener(&mut self, listener: ListenerId, x: f64, y: f64) {
        let coord = self.grid.zone_coord(x, y);
        if !self.grid.remove_listener(coord, listener) {
            debug!("Listener {:?} was not registered on zone {}", listener, coord);
            return;
        }

        if let Some(entry) = self.listeners.get_mut(&listener) {
            entry.registrations -= 1;
            if entry.registrations == 0 {
                self.listeners.remove(&listener);
            }
        }
        debug!("🔇 Listener {:?} removed from zone {}", listener, coord);
    }

    /// Starts tracking a movable and announces it to the listeners around it.
    pub fn add_movable<M: Movable>(&mut self, movable: &M) {
        let key = movable.key();
        if self.locations.contains_key(&key) {
            self.set_position(movable);
            return;
        }

        let position = movable.position();
        let coord = self.grid.zone_coord(position.x, position.y);
        self.grid.insert_movable(coord, key);
        self.locations.insert(key, coord);

        let snapshot = movable.snapshot();
        self.dispatch(self.grid.listeners_around(coord), |_| ZoneEvent::Enter {
            movable: snapshot.clone(),
        });
    }

    /// Re-evaluates the zone of a movable after its position changed.
    ///
    /// Untracked movables are added.
    pub fn set_position<M: Movable>(&mut self, movable: &M) {
        let key = movable.key();
        let Some(&old) = self.locations.get(&key) else {
            self.add_movable(movable);
            return;
        };

        let position = movable.position();
        let new = self.grid.zone_coord(position.x, position.y);
        let snapshot = movable.snapshot();

        if old == new {
            self.dispatch(self.grid.listeners_around(new), |_| ZoneEvent::Move {
                movable: snapshot.clone(),
            });
            return;
        }

        let old_listeners = self.grid.listeners_around(old);
        let new_listeners = self.grid.listeners_around(new);

        self.grid.remove_movable(old, key);
        self.grid.insert_movable(new, key);
        self.locations.insert(key, new);
        debug!("🧭 {:?} moved from zone {} to {}", key, old, new);

        let audience: BTreeSet<ListenerId> = old_listeners.union(&new_listeners).copied().collect();
        self.dispatch(audience, |id| {
            let movable = snapshot.clone();
            match (old_listeners.contains(&id), new_listeners.contains(&id)) {
                (true, true) => ZoneEvent::Move { movable },
                (true, false) => ZoneEvent::Leave { movable },
                _ => ZoneEvent::Enter { movable },
            }
        });
    }

    /// Stops tracking a movable and tells the listeners around it that it left.
    pub fn remove_movable<M: Movable>(&mut self, movable: &M) {
        let key = movable.key();
        let Some(old) = self.locations.remove(&key) else {
            debug!("{:?} is not tracked, nothing to remove", key);
            return;
        };

        self.grid.remove_movable(old, key);
        let snapshot = movable.snapshot();
        self.dispatch(self.grid.listeners_around(old), |_| ZoneEvent::Leave {
            movable: snapshot.clone(),
        });
    }

    /// Broadcasts an emote to the listeners around a tracked movable.
    pub fn emit_emote<M: Movable>(&self, movable: &M, emote: &str) {
        let Some(&coord) = self.locations.get(&movable.key()) else {
            debug!("{:?} is not tracked, emote dropped", movable.key());
            return;
        };

        let snapshot: MovableSnapshot = movable.snapshot();
        self.dispatch(self.grid.listeners_around(coord), |_| ZoneEvent::Emote {
            movable: snapshot.clone(),
            emote: emote.to_string(),
        });
    }

    /// Zone a movable is currently tracked in.
    pub fn zone_of(&self, key: MovableKey) -> Option<ZoneCoord> {
        self.locations.get(&key).copied()
    }

    /// Zone containing the world coordinate (x, y).
    pub fn zone_coord(&self, x: f64, y: f64) -> ZoneCoord {
        self.grid.zone_coord(x, y)
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Number of movables currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.locations.len()
    }

    /// Number of distinct listeners registered on at least one zone.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn dispatch<I, F>(&self, audience: I, mut make_event: F)
    where
        I: IntoIterator<Item = ListenerId>,
        F: FnMut(ListenerId) -> ZoneEvent,
    {
        for id in audience {
            if let Some(entry) = self.listeners.get(&id) {
                entry.handle.deliver(make_event(id));
            }
        }
    }
}
