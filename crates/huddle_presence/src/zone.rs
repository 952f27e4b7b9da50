//! # Zone Grid
//!
//! Partitions the world into fixed-size rectangular zones so that a position
//! update only concerns listeners looking at the surrounding area instead of
//! the whole room. Each zone holds the movables currently inside it and the
//! listeners registered on it.
//!
//! Zones are created on first use and dropped again as soon as they hold
//! neither movables nor listeners.

use crate::movable::MovableKey;
use crate::types::{ListenerId, ZoneCoord};
use std::collections::{BTreeSet, HashMap};

/// Contents of a single zone.
#[derive(Debug, Default, Clone)]
pub struct Zone {
    movables: BTreeSet<MovableKey>,
    listeners: BTreeSet<ListenerId>,
}

impl Zone {
    pub fn movables(&self) -> &BTreeSet<MovableKey> {
        &self.movables
    }

    pub fn listeners(&self) -> &BTreeSet<ListenerId> {
        &self.listeners
    }

    fn is_vacant(&self) -> bool {
        self.movables.is_empty() && self.listeners.is_empty()
    }
}

/// Lazily populated grid of zones of `zone_width` x `zone_height` world units.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    zone_width: f64,
    zone_height: f64,
    zones: HashMap<ZoneCoord, Zone>,
}

impl SpatialGrid {
    /// Creates an empty grid. Both dimensions must be strictly positive.
    pub fn new(zone_width: f64, zone_height: f64) -> Self {
        debug_assert!(zone_width > 0.0 && zone_height > 0.0);
        Self {
            zone_width,
            zone_height,
            zones: HashMap::new(),
        }
    }

    /// Zone containing the world coordinate (x, y).
    pub fn zone_coord(&self, x: f64, y: f64) -> ZoneCoord {
        ZoneCoord::new(
            (x / self.zone_width).floor() as i64,
            (y / self.zone_height).floor() as i64,
        )
    }

    pub fn zone(&self, coord: ZoneCoord) -> Option<&Zone> {
        self.zones.get(&coord)
    }

    /// Number of zones currently materialised.
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn insert_movable(&mut self, coord: ZoneCoord, key: MovableKey) {
        self.zones.entry(coord).or_default().movables.insert(key);
    }

    pub fn remove_movable(&mut self, coord: ZoneCoord, key: MovableKey) {
        if let Some(zone) = self.zones.get_mut(&coord) {
            zone.movables.remove(&key);
            self.collect(coord);
        }
    }

    /// Registers a listener on a zone. Returns `false` if it was already there.
    pub fn insert_listener(&mut self, coord: ZoneCoord, listener: ListenerId) -> bool {
        self.zones.entry(coord).or_default().listeners.insert(listener)
    }

    /// Removes a listener from a zone. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, coord: ZoneCoord, listener: ListenerId) -> bool {
        let removed = match self.zones.get_mut(&coord) {
            Some(zone) => zone.listeners.remove(&listener),
            None => false,
        };
        self.collect(coord);
        removed
    }

    /// Every listener registered on a zone of the 3x3 neighbourhood of `coord`.
    pub fn listeners_around(&self, coord: ZoneCoord) -> BTreeSet<ListenerId> {
        coord
            .neighborhood()
            .iter()
            .filter_map(|c| self.zones.get(c))
            .flat_map(|zone| zone.listeners.iter().copied())
            .collect()
    }

    /// Every movable located in a zone of the 3x3 neighbourhood of `coord`.
    pub fn movables_around(&self, coord: ZoneCoord) -> Vec<MovableKey> {
        coord
            .neighborhood()
            .iter()
            .filter_map(|c| self.zones.get(c))
            .flat_map(|zone| zone.movables.iter().copied())
            .collect()
    }

    fn collect(&mut self, coord: ZoneCoord) {
        if self.zones.get(&coord).is_some_and(Zone::is_vacant) {
            self.zones.remove(&coord);
        }
    }
}
