//! Crate-wide error type
//!
//! Every fallible operation in the crate returns [`Result`]. Fatal setup
//! errors (bind/listen failures) propagate out of `main` and produce a
//! nonzero exit; everything else is contained and logged where it occurs.

use std::io;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for server operations
#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failure (socket, stdin, write path)
    Io(io::Error),
    /// A client socket operation exceeded the configured timeout
    Timeout,
    /// A client sent a request head larger than the allowed maximum
    RequestHeadTooLarge,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::Timeout => write!(f, "client i/o timed out"),
            Error::RequestHeadTooLarge => write!(f, "request head too large"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}

impl Error {
    /// True for errors that simply mean the peer went away
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = Error::Timeout;
        assert_eq!(e.to_string(), "client i/o timed out");

        let e: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(e.to_string().contains("gone"));
    }

    #[test]
    fn test_is_disconnect() {
        let e: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(e.is_disconnect());

        let e: Error = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert!(!e.is_disconnect());

        assert!(!Error::Timeout.is_disconnect());
    }
}
