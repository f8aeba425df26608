//! Per-connection client session
//!
//! One task per connected client. The session consumes the request head,
//! writes the multipart response preamble, then loops: wait for the next
//! published frame, serialize it as one part. Every socket operation is
//! bounded by the configured client timeout, so a stalled or dead peer
//! never holds the session (or anything else) hostage for long.
//!
//! The session deregisters itself from the registry on the way out; nothing
//! else ever removes its entry.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::Result;
use crate::hub::FrameReceiver;
use crate::protocol::http;
use crate::protocol::multipart::MultipartWriter;
use crate::registry::{ClientContext, ClientRegistry};
use crate::stats::SessionStats;

/// A single client connection being served
#[derive(Debug)]
pub struct ClientSession {
    ctx: Arc<ClientContext>,
    registry: Arc<ClientRegistry>,
    frames: FrameReceiver,
    io_timeout: Duration,
    stats: SessionStats,
}

impl ClientSession {
    /// Build a session for an accepted connection
    pub fn new(
        ctx: Arc<ClientContext>,
        registry: Arc<ClientRegistry>,
        frames: FrameReceiver,
        io_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            registry,
            frames,
            io_timeout,
            stats: SessionStats::new(),
        }
    }

    /// Serve the connection to completion and deregister
    pub async fn run(mut self, stream: TcpStream) {
        let result = self.serve(stream).await;

        match result {
            Ok(()) => {
                tracing::info!(
                    client = self.ctx.id,
                    peer = %self.ctx.peer_addr,
                    "client finished"
                );
            }
            Err(e) if e.is_disconnect() => {
                tracing::info!(
                    client = self.ctx.id,
                    peer = %self.ctx.peer_addr,
                    "client disconnected"
                );
            }
            Err(e) => {
                tracing::info!(
                    client = self.ctx.id,
                    peer = %self.ctx.peer_addr,
                    error = %e,
                    "client connection failed"
                );
            }
        }

        tracing::debug!(
            client = self.ctx.id,
            frames_sent = self.stats.frames_sent,
            frames_missed = self.stats.frames_missed,
            bytes_sent = self.stats.bytes_sent,
            uptime_secs = self.ctx.uptime().as_secs(),
            "session stats"
        );

        let _ = self.registry.deregister(self.ctx.id).await;
    }

    async fn serve(&mut self, mut stream: TcpStream) -> Result<()> {
        let request = timeout(self.io_timeout, http::read_request_head(&mut stream)).await??;
        tracing::debug!(client = self.ctx.id, request = %request, "request received");

        let mut writer = MultipartWriter::new(stream);
        timeout(self.io_timeout, writer.write_preamble()).await??;

        let mut last_seq = self.frames.current_seq();
        while let Some(update) = self.frames.next_frame().await {
            timeout(self.io_timeout, writer.write_frame(&update.frame)).await??;
            self.stats
                .on_frame(update.frame.len(), update.seq - last_seq);
            last_seq = update.seq;

            tracing::trace!(
                client = self.ctx.id,
                seq = update.seq,
                bytes = update.frame.len(),
                "frame sent"
            );
        }

        // terminate signal: the hub shut down
        Ok(())
    }
}
