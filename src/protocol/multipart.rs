//! `multipart/x-mixed-replace` response serialization
//!
//! One response per connection: a header block announcing the multipart
//! body, then an unbounded sequence of parts, one JPEG image each. Players
//! replace the displayed image as each part arrives.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// Part boundary token used in the response
pub const BOUNDARY: &str = "mjpegrs-frame";

/// Writes the streaming response onto a connection
#[derive(Debug)]
pub struct MultipartWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MultipartWriter<W> {
    /// Wrap a connection
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write the response status line and headers
    pub async fn write_preamble(&mut self) -> Result<()> {
        let head = format!(
            "HTTP/1.1 200 OK\r\n\
             Server: mjpeg-rs\r\n\
             Connection: close\r\n\
             Cache-Control: no-store, no-cache, must-revalidate\r\n\
             Pragma: no-cache\r\n\
             Content-Type: multipart/x-mixed-replace; boundary={}\r\n\
             \r\n",
            BOUNDARY
        );
        self.writer.write_all(head.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write one frame as a body part
    pub async fn write_frame(&mut self, frame: &Bytes) -> Result<()> {
        let part_head = format!(
            "--{}\r\n\
             Content-Type: image/jpeg\r\n\
             Content-Length: {}\r\n\
             \r\n",
            BOUNDARY,
            frame.len()
        );
        self.writer.write_all(part_head.as_bytes()).await?;
        self.writer.write_all(frame).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
