//! # Room Server
//!
//! The layer between the transport and the presence engine. It owns no
//! sockets; it keeps the table of live rooms and the bookkeeping the transport
//! needs to talk to them.
//!
//! ## Components
//!
//! * **Room registry** ([`RoomRegistry`]) - creates rooms on first use,
//!   serializes operations per room and reclaims rooms that became empty or
//!   were poisoned by an invariant violation
//! * **Connection manager** ([`ConnectionManager`]) - allocates connection,
//!   listener and admin session ids and remembers which session each
//!   connection joined
//!
//! ## Message Flow
//!
//! 1. The transport decodes a client message
//! 2. It looks the room up in the registry and locks it
//! 3. The room operation runs and pushes zone events onto listener channels
//! 4. The transport drains those channels and encodes the events
//!
//! ```rust
//! use huddle_presence::{ConnectionId, JoinRequest, PointPosition};
//! use room_server::{create_registry, ServerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), room_server::ServerError> {
//! let registry = create_registry(ServerConfig::default());
//! let session = registry
//!     .join("_/global/maps/office.json", ConnectionId(1), JoinRequest::new("Alice", PointPosition::new(0.0, 0.0)))
//!     .await?;
//!
//! registry
//!     .with_room("_/global/maps/office.json", |room| room.leave(session))
//!     .await
//!     .transpose()?;
//! assert_eq!(registry.reap_empty_rooms().await, 1);
//! # Ok(())
//! # }
//! ```

pub use config::ServerConfig;
pub use connection::{ClientConnection, ConnectionManager};
pub use error::ServerError;
pub use registry::{RegistryStats, RoomRegistry, SharedRoom};

pub mod config;
pub mod connection;
pub mod error;
pub mod registry;

#[cfg(test)]
mod tests;

/// Creates a room registry for the given configuration.
pub fn create_registry(config: ServerConfig) -> RoomRegistry {
    RoomRegistry::new(config)
}
