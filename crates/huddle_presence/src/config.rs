//! Proximity tuning shared by every room of a server.

use serde::{Deserialize, Serialize};

/// Zone sizes and grouping thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Width of a zone in world units
    #[serde(default = "default_zone_size")]
    pub zone_width: f64,
    /// Height of a zone in world units
    #[serde(default = "default_zone_size")]
    pub zone_height: f64,
    /// Maximum distance between two lone participants for them to form a group
    #[serde(default = "default_min_distance")]
    pub min_distance: f64,
    /// Maximum distance between a member and its group centroid
    #[serde(default = "default_group_radius")]
    pub group_radius: f64,
    /// A group holding this many members accepts no one else
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
}

fn default_zone_size() -> f64 {
    320.0
}

fn default_min_distance() -> f64 {
    64.0
}

fn default_group_radius() -> f64 {
    48.0
}

fn default_max_group_size() -> usize {
    4
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            zone_width: default_zone_size(),
            zone_height: default_zone_size(),
            min_distance: default_min_distance(),
            group_radius: default_group_radius(),
            max_group_size: default_max_group_size(),
        }
    }
}

impl ProximityConfig {
    /// Initial threshold of the closest-candidate search.
    pub fn search_radius(&self) -> f64 {
        self.min_distance.max(self.group_radius)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.zone_width > 0.0 && self.zone_height > 0.0) {
            return Err("Zone width and height must be greater than 0".to_string());
        }
        if !(self.min_distance >= 0.0 && self.min_distance.is_finite()) {
            return Err("Minimum grouping distance must be a non-negative number".to_string());
        }
        if !(self.group_radius >= 0.0 && self.group_radius.is_finite()) {
            return Err("Group radius must be a non-negative number".to_string());
        }
        if self.max_group_size < 2 {
            return Err("Maximum group size must be at least 2".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProximityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.zone_width, 320.0);
        assert_eq!(config.search_radius(), 64.0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ProximityConfig::default();
        config.zone_height = 0.0;
        assert!(config.validate().is_err());

        let mut config = ProximityConfig::default();
        config.max_group_size = 1;
        assert!(config.validate().is_err());

        let mut config = ProximityConfig::default();
        config.group_radius = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: ProximityConfig = serde_json::from_str(r#"{ "min_distance": 100.0 }"#).unwrap();
        assert_eq!(config.min_distance, 100.0);
        assert_eq!(config.group_radius, 48.0);
        assert_eq!(config.max_group_size, 4);
    }
}
