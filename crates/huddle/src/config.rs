//! Configuration management for the huddle room server.
//!
//! Settings are loaded from a TOML file, overridden from the command line and
//! converted into the types the room server expects.

use huddle_presence::ProximityConfig;
use room_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Room lifecycle settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Zone sizes and grouping thresholds applied to every room
    #[serde(default)]
    pub proximity: ProximityConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Room lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// How often empty and poisoned rooms are reclaimed, in milliseconds
    #[serde(default = "default_reap_interval_ms")]
    pub reap_interval_ms: u64,
    /// How often registry statistics are logged, in seconds (0 to disable)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_reap_interval_ms() -> u64 {
    30_000
}

fn default_stats_interval_secs() -> u64 {
    60
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            reap_interval_ms: default_reap_interval_ms(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, writing the defaults there first if
    /// the file does not exist yet.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the file settings into the room server configuration.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            proximity: self.proximity.clone(),
            reap_interval_ms: self.server.reap_interval_ms,
            stats_interval_secs: self.server.stats_interval_secs,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.to_server_config().validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.reap_interval_ms, 30_000);
        assert_eq!(config.server.stats_interval_secs, 60);
        assert_eq!(config.proximity, ProximityConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = PathBuf::from(temp_file.path());
        drop(temp_file);
        assert!(!temp_path.exists());

        let config = AppConfig::load_from_file(&temp_path).await.unwrap();
        assert_eq!(config.server.reap_interval_ms, 30_000);

        // The defaults were written out and read back identically
        assert!(temp_path.exists());
        let reloaded = AppConfig::load_from_file(&temp_path).await.unwrap();
        assert_eq!(reloaded.proximity, config.proximity);

        fs::remove_file(&temp_path).await.ok();
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
reap_interval_ms = 5000

[proximity]
min_distance = 100.0
group_radius = 200.0

[logging]
level = "debug"
json_format = true
"#;
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = PathBuf::from(temp_file.path());
        fs::write(&temp_path, toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&temp_path).await.unwrap();
        assert_eq!(config.server.reap_interval_ms, 5000);
        assert_eq!(config.server.stats_interval_secs, 60);
        assert_eq!(config.proximity.min_distance, 100.0);
        assert_eq!(config.proximity.group_radius, 200.0);
        assert_eq!(config.proximity.zone_width, 320.0);
        assert_eq!(config.proximity.max_group_size, 4);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_from_malformed_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = PathBuf::from(temp_file.path());
        fs::write(&temp_path, "[proximity\nmin_distance = ").await.unwrap();

        assert!(AppConfig::load_from_file(&temp_path).await.is_err());
    }

    #[test]
    fn test_to_server_config_conversion() {
        let mut config = AppConfig::default();
        config.server.reap_interval_ms = 1000;
        config.server.stats_interval_secs = 0;
        config.proximity.max_group_size = 6;

        let server_config = config.to_server_config();
        assert_eq!(server_config.reap_interval_ms, 1000);
        assert!(server_config.stats_interval().is_none());
        assert_eq!(server_config.proximity.max_group_size, 6);
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        for level in ["trace", "debug", "info", "warn", "error"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level {level} rejected");
        }
    }

    #[test]
    fn test_validation_invalid_proximity() {
        let mut config = AppConfig::default();
        config.proximity.max_group_size = 1;
        assert!(config.validate().is_err());

        config.proximity.max_group_size = 4;
        config.proximity.zone_width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_reap_interval() {
        let mut config = AppConfig::default();
        config.server.reap_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
