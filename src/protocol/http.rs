//! Minimal HTTP request-head handling
//!
//! The server never routes on the request: anything that connects and sends
//! a request head gets the stream. The head is read up to the blank line and
//! discarded; only the request line is returned, for logging.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Upper bound on the request head; anything larger is rejected
pub const MAX_REQUEST_HEAD: usize = 4096;

/// Read the request head through the terminating blank line
///
/// Returns the request line (first line of the head) for logging. The rest
/// of the head is discarded. Over-reading past the blank line is harmless:
/// the connection is write-only from here on.
pub async fn read_request_head<R>(reader: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(256);
    let mut chunk = [0u8; 512];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before request head completed",
            )));
        }

        head.extend_from_slice(&chunk[..n]);
        if head_complete(&head) {
            return Ok(request_line(&head));
        }
        if head.len() > MAX_REQUEST_HEAD {
            return Err(Error::RequestHeadTooLarge);
        }
    }
}

fn head_complete(head: &[u8]) -> bool {
    head.windows(4).any(|w| w == b"\r\n\r\n") || head.windows(2).any(|w| w == b"\n\n")
}

fn request_line(head: &[u8]) -> String {
    let line = head.split(|&b| b == b'\n').next().unwrap_or_default();
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
