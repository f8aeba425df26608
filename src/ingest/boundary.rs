//! Frame boundary detection
//!
//! The input is an endless byte stream carrying delimiter-separated frames.
//! [`FrameAssembler`] accumulates chunks, searches a bounded lookback window
//! for the active [`Separator`], and carves off a completed frame when a
//! boundary is found.
//!
//! The lookback window covers the last `min(2 * chunk_size, len)` bytes of
//! the accumulated buffer, so detection cost stays bounded per chunk: a
//! separator can straddle at most two consecutive reads before it is seen.

use bytes::{Buf, Bytes, BytesMut};

/// JPEG start-of-image marker
pub const JPEG_START: [u8; 2] = [0xFF, 0xD8];

/// JPEG end-of-image marker
pub const JPEG_END: [u8; 2] = [0xFF, 0xD9];

/// Auto-derived separator: end marker of one frame followed by the start
/// marker of the next
const AUTO_SEPARATOR: [u8; 4] = [0xFF, 0xD9, 0xFF, 0xD8];

/// Explicit separators shorter than this are likely to appear inside frame
/// data; startup logs an advisory for them
pub const SEPARATOR_ADVISORY_LEN: usize = 4;

/// Separator between frames in the input stream
///
/// Fixed for the process lifetime once resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Separator {
    /// Auto-derived JPEG end+start marker pair (`FF D9 FF D8`)
    Auto,
    /// User-supplied byte sequence
    Explicit(Bytes),
}

impl Separator {
    /// Create an explicit separator from arbitrary bytes
    pub fn explicit(bytes: impl Into<Bytes>) -> Self {
        Separator::Explicit(bytes.into())
    }

    /// The byte pattern searched for in the stream
    pub fn pattern(&self) -> &[u8] {
        match self {
            Separator::Auto => &AUTO_SEPARATOR,
            Separator::Explicit(b) => b,
        }
    }

    /// True when an explicit separator is short enough to risk false
    /// positive matches inside frame data
    pub fn is_risky(&self) -> bool {
        match self {
            Separator::Auto => false,
            Separator::Explicit(b) => b.len() < SEPARATOR_ADVISORY_LEN,
        }
    }
}

/// Outcome of feeding one input chunk to the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// A boundary was found; the completed frame is carved off and the
    /// remainder stays buffered as the start of the next frame
    Frame(Bytes),
    /// No boundary yet; the chunk is buffered
    Buffered,
    /// Appending the chunk would exceed capacity before any boundary was
    /// found; the buffer and the chunk were discarded
    Overflow {
        /// Bytes thrown away (buffered bytes plus the offending chunk)
        discarded: usize,
    },
}

/// Accumulates input chunks and carves complete frames at separator
/// boundaries
///
/// Owned exclusively by the ingest loop; completed frames leave as immutable
/// [`Bytes`] and are safe to hand to any number of consumers.
#[derive(Debug)]
pub struct FrameAssembler {
    buf: BytesMut,
    capacity: usize,
    chunk_size: usize,
    separator: Separator,
}

impl FrameAssembler {
    /// Create an assembler with a fixed buffer capacity and the chunk size
    /// used by the reader (bounds the lookback window)
    pub fn new(separator: Separator, capacity: usize, chunk_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity.min(64 * 1024)),
            capacity,
            chunk_size,
            separator,
        }
    }

    /// Bytes currently buffered toward the next frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Append one input chunk and scan for a boundary
    ///
    /// At most one frame is carved per call; a second separator already in
    /// the buffer is found on the next call, still inside the lookback
    /// window.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> ChunkOutcome {
        if self.buf.len() + chunk.len() > self.capacity {
            let discarded = self.buf.len() + chunk.len();
            self.buf.clear();
            return ChunkOutcome::Overflow { discarded };
        }

        self.buf.extend_from_slice(chunk);

        let lookback = (2 * self.chunk_size).min(self.buf.len());
        let window_start = self.buf.len() - lookback;
        let Some(rel) = find(&self.buf[window_start..], self.separator.pattern()) else {
            return ChunkOutcome::Buffered;
        };
        let at = window_start + rel;

        let frame = match &self.separator {
            // The end marker belongs to the finished frame; the remainder
            // restarts at the start marker so the next frame is a complete
            // image as well.
            Separator::Auto => self.buf.split_to(at + JPEG_END.len()).freeze(),
            // The separator belongs to neither frame.
            Separator::Explicit(sep) => {
                let frame = self.buf.split_to(at).freeze();
                self.buf.advance(sep.len());
                frame
            }
        };

        ChunkOutcome::Frame(frame)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 64;
    const CAPACITY: usize = 1024;

    fn assembler(separator: Separator) -> FrameAssembler {
        FrameAssembler::new(separator, CAPACITY, CHUNK)
    }

    fn fake_jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = JPEG_START.to_vec();
        out.extend_from_slice(payload);
        out.extend_from_slice(&JPEG_END);
        out
    }

    #[test]
    fn test_auto_boundary_across_two_chunks() {
        let mut asm = assembler(Separator::Auto);

        // chunk A ends with the end marker, chunk B starts with the start
        // marker of the next image
        let mut a = JPEG_START.to_vec();
        a.extend_from_slice(b"jpeg-one");
        a.extend_from_slice(&JPEG_END);
        let mut b = JPEG_START.to_vec();
        b.extend_from_slice(b"jpeg-two");

        assert_eq!(asm.push_chunk(&a), ChunkOutcome::Buffered);
        let ChunkOutcome::Frame(frame) = asm.push_chunk(&b) else {
            panic!("expected a completed frame");
        };

        assert_eq!(&frame[..], &fake_jpeg(b"jpeg-one")[..]);
        // remainder keeps the start marker of the second image
        assert_eq!(asm.buffered(), 2 + b"jpeg-two".len());
    }

    #[test]
    fn test_explicit_separator_excluded_from_frame() {
        let mut asm = assembler(Separator::explicit(&b"----FRAME----"[..]));

        let mut input = b"first-frame".to_vec();
        input.extend_from_slice(b"----FRAME----");
        input.extend_from_slice(b"second");

        let ChunkOutcome::Frame(frame) = asm.push_chunk(&input) else {
            panic!("expected a completed frame");
        };

        assert_eq!(&frame[..], b"first-frame");
        assert_eq!(asm.buffered(), b"second".len());
    }

    #[test]
    fn test_one_frame_per_chunk_scan() {
        let mut asm = assembler(Separator::explicit(&b"|sep|"[..]));

        let ChunkOutcome::Frame(first) = asm.push_chunk(b"aaa|sep|bbb|sep|ccc") else {
            panic!("expected a completed frame");
        };
        assert_eq!(&first[..], b"aaa");

        // second boundary is still buffered and found on the next chunk
        let ChunkOutcome::Frame(second) = asm.push_chunk(b"") else {
            panic!("expected the second frame");
        };
        assert_eq!(&second[..], b"bbb");
        assert_eq!(asm.buffered(), 3);
    }

    #[test]
    fn test_lookback_window_is_bounded() {
        let mut asm = assembler(Separator::explicit(&b"|sep|"[..]));

        // separator sits further back than 2 * chunk_size once the filler
        // is appended, so the scan must not see it
        let mut input = b"frame|sep|".to_vec();
        input.extend_from_slice(&vec![b'x'; 3 * CHUNK]);

        assert_eq!(asm.push_chunk(&input), ChunkOutcome::Buffered);
    }

    #[test]
    fn test_overflow_discards_buffer_and_chunk() {
        let mut asm = assembler(Separator::Auto);

        assert_eq!(asm.push_chunk(&vec![0u8; 1000]), ChunkOutcome::Buffered);
        assert_eq!(
            asm.push_chunk(&vec![0u8; 100]),
            ChunkOutcome::Overflow { discarded: 1100 }
        );
        assert_eq!(asm.buffered(), 0);

        // ingestion continues from an empty buffer
        let mut next = fake_jpeg(b"next");
        next.extend_from_slice(&JPEG_START);
        let ChunkOutcome::Frame(frame) = asm.push_chunk(&next) else {
            panic!("expected a frame after the overflow reset");
        };
        assert_eq!(&frame[..], &fake_jpeg(b"next")[..]);
    }

    #[test]
    fn test_separator_risk() {
        assert!(!Separator::Auto.is_risky());
        assert!(Separator::explicit(&b"ab"[..]).is_risky());
        assert!(!Separator::explicit(&b"----FRAME----"[..]).is_risky());
    }
}
