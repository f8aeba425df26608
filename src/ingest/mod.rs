//! Input ingestion
//!
//! The producer side of the system: reads the incoming byte stream in
//! fixed-size chunks, feeds the frame assembler, and publishes every
//! completed frame to the hub. End of input (or a fatal read error)
//! triggers the shutdown sequence for the whole process.

pub mod boundary;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use crate::error::Result;
use crate::hub::FrameHub;
use crate::server::config::ServerConfig;

pub use boundary::{ChunkOutcome, FrameAssembler, Separator};

/// The producer loop
///
/// Owns the frame assembler outright; the only shared state it touches is
/// the hub's publication slot, which never blocks on consumers.
pub struct IngestLoop {
    assembler: FrameAssembler,
    hub: Arc<FrameHub>,
    chunk_size: usize,
    shutdown: CancellationToken,
}

impl IngestLoop {
    /// Build the loop from the server configuration
    pub fn new(config: &ServerConfig, hub: Arc<FrameHub>, shutdown: CancellationToken) -> Self {
        Self {
            assembler: FrameAssembler::new(
                config.frame_separator(),
                config.frame_capacity,
                config.chunk_size,
            ),
            hub,
            chunk_size: config.chunk_size,
            shutdown,
        }
    }

    /// Consume the input stream until end of input, a read error, or
    /// shutdown; cancels the shutdown token on the way out so the rest of
    /// the server drains
    pub async fn run<R>(mut self, mut input: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            let n = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                read = input.read(&mut chunk) => match read {
                    Ok(0) => {
                        tracing::debug!("input: end of stream");
                        break;
                    }
                    Ok(n) => n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "input: read failed");
                        self.shutdown.cancel();
                        return Err(e.into());
                    }
                },
            };

            match self.assembler.push_chunk(&chunk[..n]) {
                ChunkOutcome::Frame(frame) => {
                    let seq = self.hub.publish(frame.clone());
                    tracing::trace!(
                        seq,
                        bytes = frame.len(),
                        clients = self.hub.receiver_count(),
                        "frame published"
                    );
                }
                ChunkOutcome::Buffered => {}
                ChunkOutcome::Overflow { discarded } => {
                    tracing::error!(
                        bytes = discarded,
                        "input: frame too large for buffer, discarding"
                    );
                }
            }
        }

        self.shutdown.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::boundary::{JPEG_END, JPEG_START};
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig::default().chunk_size(64).frame_capacity(1024)
    }

    fn fake_jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = JPEG_START.to_vec();
        out.extend_from_slice(payload);
        out.extend_from_slice(&JPEG_END);
        out
    }

    #[tokio::test]
    async fn test_publishes_completed_frames() {
        let hub = Arc::new(FrameHub::new());
        let shutdown = CancellationToken::new();
        let mut rx = hub.subscribe();

        let mut input = fake_jpeg(b"frame-one");
        input.extend_from_slice(&fake_jpeg(b"frame-two"));

        let ingest = IngestLoop::new(&config(), Arc::clone(&hub), shutdown.clone());
        ingest.run(&input[..]).await.expect("clean ingest");

        let update = rx.next_frame().await.expect("frame expected");
        assert_eq!(update.seq, 1);
        assert_eq!(update.frame, Bytes::from(fake_jpeg(b"frame-one")));
    }

    #[tokio::test]
    async fn test_end_of_input_cancels_shutdown_token() {
        let hub = Arc::new(FrameHub::new());
        let shutdown = CancellationToken::new();

        let ingest = IngestLoop::new(&config(), hub, shutdown.clone());
        ingest.run(&b""[..]).await.expect("clean ingest");

        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_overflow_does_not_stop_ingestion() {
        let hub = Arc::new(FrameHub::new());
        let shutdown = CancellationToken::new();
        let mut rx = hub.subscribe();

        // 17 chunks of boundary-free junk: 16 fill the buffer to capacity,
        // the 17th trips the overflow reset, leaving the buffer empty for
        // the clean frame that follows
        let mut input = vec![0u8; 17 * 64];
        input.extend_from_slice(&fake_jpeg(b"recovered"));
        input.extend_from_slice(&JPEG_START);

        let ingest = IngestLoop::new(&config(), Arc::clone(&hub), shutdown.clone());
        ingest.run(&input[..]).await.expect("clean ingest");

        let update = rx.next_frame().await.expect("frame expected");
        assert_eq!(update.frame, Bytes::from(fake_jpeg(b"recovered")));
    }
}
