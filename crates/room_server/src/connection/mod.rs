//! Transport-facing connection bookkeeping.
//!
//! The transport layer owns the sockets. This module hands out the opaque ids
//! the rooms work with and remembers which room session each connection is
//! bound to, so a dropped socket can be turned into a `leave`.

pub mod client;
pub mod manager;

pub use client::ClientConnection;
pub use manager::ConnectionManager;
