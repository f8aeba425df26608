//! Registry store implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::entry::ClientContext;

/// Ordered store of live clients
///
/// Insertion-ordered; every live client appears exactly once. Mutation
/// happens under the store's own lock: the acceptor inserts, and each
/// session removes only its own entry just before it exits.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: Mutex<Vec<Arc<ClientContext>>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate an id, build the context, and append it
    pub async fn register(&self, peer_addr: SocketAddr) -> Arc<ClientContext> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let ctx = Arc::new(ClientContext::new(id, peer_addr));

        let mut clients = self.clients.lock().await;
        clients.push(Arc::clone(&ctx));
        tracing::debug!(clients = clients.len(), "current clients");

        ctx
    }

    /// Remove a client by id, preserving the order of the survivors
    ///
    /// Called only by the owning session on its way out. Returns the removed
    /// entry, or `None` if the id is unknown.
    pub async fn deregister(&self, id: u64) -> Option<Arc<ClientContext>> {
        let mut clients = self.clients.lock().await;
        let pos = clients.iter().position(|c| c.id == id)?;
        let ctx = clients.remove(pos);
        tracing::debug!(clients = clients.len(), "current clients");

        Some(ctx)
    }

    /// Number of live clients
    pub async fn count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Snapshot of the live clients, in registration order
    pub async fn snapshot(&self) -> Vec<Arc<ClientContext>> {
        self.clients.lock().await.clone()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
