//! Connection manager: id allocation and session bindings.

use super::client::ClientConnection;
use huddle_presence::{
    AdminEvent, AdminSession, AdminSessionId, ConnectionId, ListenerId, SessionId, ZoneEvent,
    ZoneListener,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

/// Central manager for all client connections.
///
/// Ids come from atomic counters and are never reused. The connection table
/// sits behind an async `RwLock` because transport handlers touch it from many
/// tasks at once.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: Arc<RwLock<HashMap<ConnectionId, ClientConnection>>>,
    next_connection: AtomicU64,
    next_listener: AtomicU64,
    next_admin: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its id.
    pub async fn add_connection(&self, remote_addr: SocketAddr) -> ConnectionId {
        let id = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed) + 1);
        self.connections
            .write()
            .await
            .insert(id, ClientConnection::new(remote_addr));
        info!("🔗 Connection {:?} from {}", id, remote_addr);
        id
    }

    /// Forgets a connection. Returns what was known about it, including the
    /// room session the caller still has to leave.
    pub async fn remove_connection(&self, id: ConnectionId) -> Option<ClientConnection> {
        let removed = self.connections.write().await.remove(&id);
        if let Some(connection) = &removed {
            info!("❌ Connection {:?} from {} disconnected", id, connection.remote_addr);
        }
        removed
    }

    /// Records the room session a connection joined. Returns `false` if the
    /// connection is unknown.
    pub async fn bind_session(&self, id: ConnectionId, room_id: &str, session: SessionId) -> bool {
        match self.connections.write().await.get_mut(&id) {
            Some(connection) => {
                connection.session = Some((room_id.to_string(), session));
                debug!("Connection {:?} bound to session {} in room {}", id, session, room_id);
                true
            }
            None => false,
        }
    }

    pub async fn session_of(&self, id: ConnectionId) -> Option<(String, SessionId)> {
        self.connections
            .read()
            .await
            .get(&id)
            .and_then(|connection| connection.session.clone())
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Allocates a zone listener and the receiver its events arrive on.
    pub fn open_zone_listener(&self) -> (ZoneListener, mpsc::UnboundedReceiver<ZoneEvent>) {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed) + 1);
        ZoneListener::channel(id)
    }

    /// Allocates an admin session and the receiver its events arrive on.
    pub fn open_admin_session(&self) -> (AdminSession, mpsc::UnboundedReceiver<AdminEvent>) {
        let id = AdminSessionId(self.next_admin.fetch_add(1, Ordering::Relaxed) + 1);
        AdminSession::channel(id)
    }
}
