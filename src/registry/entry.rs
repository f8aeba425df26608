//! Per-client registry entry

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client as tracked by the registry
///
/// Created by the acceptor on a successful accept; lives in the registry
/// until the owning session removes it on exit.
#[derive(Debug)]
pub struct ClientContext {
    /// Unique client id, allocated by the registry
    pub id: u64,
    /// Remote peer address
    pub peer_addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
}

impl ClientContext {
    /// Create a new context
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
        }
    }

    /// How long this client has been connected
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
