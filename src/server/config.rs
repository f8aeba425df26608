//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use crate::ingest::boundary::Separator;

/// Default TCP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-client socket timeout
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default input read chunk size
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024;

/// Default frame buffer capacity
pub const DEFAULT_FRAME_CAPACITY: usize = 4 * 1024 * 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on
    pub port: u16,

    /// Listen only on the loopback interface
    pub listen_localhost: bool,

    /// Per-client socket timeout (request read and every frame write)
    pub client_timeout: Duration,

    /// Input read chunk size; also bounds the boundary lookback window
    pub chunk_size: usize,

    /// Frame buffer capacity; a frame growing past this is discarded
    pub frame_capacity: usize,

    /// Explicit frame separator (None = auto-detect JPEG frame markers)
    pub separator: Option<Bytes>,

    /// Enable TCP_NODELAY on accepted connections
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            listen_localhost: false,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            separator: None,
            tcp_nodelay: true, // frames should not sit in Nagle buffers
        }
    }
}

impl ServerConfig {
    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Restrict listening to the loopback interface
    pub fn listen_localhost(mut self, localhost: bool) -> Self {
        self.listen_localhost = localhost;
        self
    }

    /// Set the per-client socket timeout
    pub fn client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = timeout;
        self
    }

    /// Set the input read chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the frame buffer capacity
    pub fn frame_capacity(mut self, capacity: usize) -> Self {
        self.frame_capacity = capacity;
        self
    }

    /// Use an explicit frame separator instead of JPEG marker detection
    pub fn separator(mut self, separator: impl Into<Bytes>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Address the listener binds to
    pub fn bind_addr(&self) -> SocketAddr {
        if self.listen_localhost {
            ([127, 0, 0, 1], self.port).into()
        } else {
            ([0, 0, 0, 0], self.port).into()
        }
    }

    /// The separator the boundary detector will search for
    pub fn frame_separator(&self) -> Separator {
        match &self.separator {
            Some(bytes) => Separator::Explicit(bytes.clone()),
            None => Separator::Auto,
        }
    }
}
