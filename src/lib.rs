//! MJPEG streaming server
//!
//! Reads a motion-JPEG byte stream on one end and fans completed frames out
//! to any number of connected HTTP clients on the other, each served as a
//! `multipart/x-mixed-replace` stream.
//!
//! # Architecture
//!
//! ```text
//!   stdin ──► IngestLoop ──► FrameAssembler ──► FrameHub
//!                                            (versioned latest-frame slot)
//!                                                   │ notify
//!                        ┌──────────────────────────┼──────────────────┐
//!                        ▼                          ▼                  ▼
//!                 ClientSession             ClientSession       ClientSession
//!                 multipart part ──► TCP    ...                 ...
//! ```
//!
//! Frames are never queued: the hub holds only the most recent frame,
//! tagged with a monotonic sequence number. A client that keeps up sees
//! every frame; a client that stalls skips straight to the latest one. The
//! producer never waits for consumers, and a consumer always receives a
//! complete frame because published frames are immutable.
//!
//! The [`registry`] tracks connected clients under its own lock,
//! independent of the frame path, so connection churn never delays frame
//! publication.

pub mod error;
pub mod hub;
pub mod ingest;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use hub::{FrameHub, FrameReceiver, FrameUpdate};
pub use ingest::IngestLoop;
pub use registry::{ClientContext, ClientRegistry};
pub use server::{MjpegServer, ServerConfig};
