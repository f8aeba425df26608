//! MJPEG server listener
//!
//! Binds the TCP socket, accepts connections, and spawns one session task
//! per client. Shutdown drains in order: stop accepting, close the
//! listener, wake every session with the terminate signal, then join every
//! session task before returning.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::Result;
use crate::hub::FrameHub;
use crate::ingest::boundary::SEPARATOR_ADVISORY_LEN;
use crate::registry::ClientRegistry;
use crate::server::config::ServerConfig;
use crate::session::ClientSession;

/// MJPEG fan-out server
pub struct MjpegServer {
    config: ServerConfig,
    listener: TcpListener,
    hub: Arc<FrameHub>,
    registry: Arc<ClientRegistry>,
    tracker: TaskTracker,
}

impl MjpegServer {
    /// Bind the listening socket
    ///
    /// Any failure here is a fatal setup error; nothing has started yet.
    pub async fn bind(config: ServerConfig, hub: Arc<FrameHub>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        if config.frame_separator().is_risky() {
            tracing::warn!(
                min_len = SEPARATOR_ADVISORY_LEN,
                "the input separator supplied is very likely to appear in the \
                 actual frame data (consider a longer one)"
            );
        }

        Ok(Self {
            config,
            listener,
            hub,
            registry: Arc::new(ClientRegistry::new()),
            tracker: TaskTracker::new(),
        })
    }

    /// Address the listener actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The registry of live clients
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Accept connections until `shutdown` fires, then drain
    ///
    /// Returns once every session task has finished.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("shutdown requested, draining clients");
            }
            _ = self.accept_loop() => {}
        }

        tracing::debug!("closing listener");
        drop(self.listener);

        // final broadcast: every blocked session wakes, observes the
        // terminate signal, and exits its loop
        self.hub.shutdown();
        self.tracker.close();

        let remaining = self.registry.count().await;
        if remaining > 0 {
            tracing::debug!(clients = remaining, "waiting for clients to finish");
        }
        self.tracker.wait().await;
        tracing::info!("all clients finished");

        Ok(())
    }

    async fn accept_loop(&self) {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    // a single failed accept is not fatal; keep serving
                    tracing::error!(error = %e, "failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(peer = %peer_addr, error = %e, "failed to set TCP_NODELAY");
            }
        }

        let ctx = self.registry.register(peer_addr).await;
        tracing::info!(client = ctx.id, peer = %peer_addr, "new client connection");

        let session = ClientSession::new(
            ctx,
            Arc::clone(&self.registry),
            self.hub.subscribe(),
            self.config.client_timeout,
        );
        self.tracker.spawn(session.run(socket));
    }
}
