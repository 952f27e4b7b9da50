//! State tracked per transport connection.

use huddle_presence::SessionId;
use std::net::SocketAddr;
use std::time::SystemTime;

/// One connected client.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,

    /// Room and session this connection joined, once it did
    pub session: Option<(String, SessionId)>,
}

impl ClientConnection {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            connected_at: SystemTime::now(),
            session: None,
        }
    }

    pub fn room_id(&self) -> Option<&str> {
        self.session.as_ref().map(|(room_id, _)| room_id.as_str())
    }
}
