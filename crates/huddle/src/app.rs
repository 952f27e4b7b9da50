//! Main application logic and lifecycle management.
//!
//! The `Application` owns the room registry and the background tasks that
//! keep it tidy: the reaper releasing empty or poisoned rooms, the periodic
//! statistics report and the group event log.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, wait_for_signal},
};
use huddle_presence::{GroupEvent, ShutdownState};
use room_server::{RegistryStats, RoomRegistry};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Live rooms
    registry: Arc<RoomRegistry>,
    /// Group membership changes of every room
    group_events: UnboundedReceiver<GroupEvent>,
    /// Shared with the registry so a signal stops new joins immediately
    shutdown: ShutdownState,
}

impl Application {
    /// Loads the configuration, applies command-line overrides, validates
    /// the result and builds the room registry.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(min_distance) = args.min_distance {
            config.proximity.min_distance = min_distance;
        }
        if let Some(group_radius) = args.group_radius {
            config.proximity.group_radius = group_radius;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let shutdown = ShutdownState::new();
        let (sender, group_events) = tokio::sync::mpsc::unbounded_channel();
        let registry = RoomRegistry::try_new(config.to_server_config())?
            .with_group_events(sender)
            .with_shutdown_state(shutdown.clone());

        Ok(Self {
            config,
            registry: Arc::new(registry),
            group_events,
            shutdown,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    /// Runs until a termination signal arrives, then releases every room.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting huddle room server");
        self.log_configuration_summary();

        let Application {
            registry,
            group_events,
            shutdown,
            ..
        } = self;

        let mut tasks = vec![
            spawn_reaper(Arc::clone(&registry)),
            spawn_group_event_log(group_events),
        ];
        if let Some(handle) = spawn_stats_report(Arc::clone(&registry)) {
            tasks.push(handle);
        }

        info!("✅ Huddle server is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        setup_signal_handlers(&shutdown).await?;

        // A second signal skips the graceful path
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("📡 Phase 1: Stopping background tasks...");
        for task in &tasks {
            task.abort();
        }

        let final_stats = registry.stats().await;

        info!("🧹 Phase 2: Releasing rooms...");
        registry.shutdown();

        log_final_statistics(&final_stats);
        info!("✅ Huddle server shutdown complete");
        Ok(())
    }

    fn log_configuration_summary(&self) {
        let proximity = &self.config.proximity;
        info!("📋 Configuration Summary:");
        info!(
            "  🗺️ Zones: {:.0}x{:.0}",
            proximity.zone_width, proximity.zone_height
        );
        info!(
            "  🤝 Grouping: meet within {:.0}, stay within {:.0}, at most {} per group",
            proximity.min_distance, proximity.group_radius, proximity.max_group_size
        );
        info!(
            "  🧹 Reaper interval: {}ms",
            self.config.server.reap_interval_ms
        );
        match self.registry.config().stats_interval() {
            Some(interval) => info!("  📊 Stats every {}s", interval.as_secs()),
            None => info!("  📊 Periodic stats disabled"),
        }
    }
}

fn spawn_reaper(registry: Arc<RoomRegistry>) -> JoinHandle<()> {
    let period = registry.config().reap_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let reaped = registry.reap_empty_rooms().await;
            if reaped > 0 {
                debug!("🧹 Reaper released {} room(s)", reaped);
            }
        }
    })
}

fn spawn_stats_report(registry: Arc<RoomRegistry>) -> Option<JoinHandle<()>> {
    let period = registry.config().stats_interval()?;
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let stats = registry.stats().await;
            info!(
                "📊 Rooms: {} | participants: {} | groups: {} | admins: {} | listeners: {}",
                stats.rooms, stats.participants, stats.groups, stats.admins, stats.listeners
            );
            if stats.poisoned_rooms > 0 {
                warn!("☣️ {} poisoned room(s) awaiting the reaper", stats.poisoned_rooms);
            }
        }
    }))
}

fn spawn_group_event_log(mut group_events: UnboundedReceiver<GroupEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = group_events.recv().await {
            match event {
                GroupEvent::Joined { group_id, session_id, .. } => {
                    debug!("🤝 Session {} joined group {}", session_id, group_id);
                }
                GroupEvent::Left { group_id, session_id, .. } => {
                    debug!("👋 Session {} left group {}", session_id, group_id);
                }
            }
        }
    })
}

fn log_final_statistics(stats: &RegistryStats) {
    info!("📊 Final Statistics:");
    info!("  - Rooms released: {}", stats.rooms);
    info!("  - Participants still connected: {}", stats.participants);
    info!("  - Groups dissolved: {}", stats.groups);
    if stats.poisoned_rooms > 0 {
        warn!("  - Poisoned rooms: {}", stats.poisoned_rooms);
    }
}
