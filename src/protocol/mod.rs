//! Per-connection wire protocol
//!
//! The serving side of the system speaks just enough HTTP to feed a browser
//! or media player: the incoming request head is consumed and discarded
//! (every connection gets the stream, regardless of path), and the response
//! is an endless `multipart/x-mixed-replace` body with one JPEG part per
//! frame.

pub mod http;
pub mod multipart;

pub use http::read_request_head;
pub use multipart::MultipartWriter;
