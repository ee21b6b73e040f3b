//! MJPEG frame extraction.
//!
//! A multipart MJPEG stream is treated as an opaque byte stream: frames
//! are whatever lies between a JPEG start-of-image marker and the next
//! end-of-image marker.  Part headers and boundaries fall between frames
//! and are discarded along with the frame that follows them.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Bytes requested per read.
pub const CHUNK_SIZE: usize = 4096;

/// Frames are shrunk to fit this box.
pub const DISPLAY_SIZE: (u32, u32) = (640, 480);

// ── splitter ─────────────────────────────────────────────────────────────

/// Accumulates stream bytes and cuts complete JPEGs out of them.
///
/// The buffer only shrinks when a whole frame is cut out, so a source that
/// never sends a start marker grows it without bound.  Camera streams
/// deliver a frame every few kilobytes; callers reading untrusted sources
/// should watch [`buffered`](Self::buffered).
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buf: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the stream.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Cut the next complete frame (SOI through EOI inclusive) out of the
    /// buffer.  `None` until both markers have arrived.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let start = find(&self.buf, SOI, 0)?;
        let end = find(&self.buf, EOI, start + SOI.len())? + EOI.len();

        let frame = self.buf[start..end].to_vec();
        self.buf.drain(..end);
        Some(frame)
    }

    /// Bytes waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

fn find(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|w| w == marker)
        .map(|i| i + from)
}

/// Decode one JPEG and shrink it to fit `max`, keeping the aspect ratio.
/// Corrupt frames yield `None`.
pub fn decode_frame(jpeg: &[u8], max: (u32, u32)) -> Option<DynamicImage> {
    let img = match image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg) {
        Ok(img) => img,
        Err(e) => {
            debug!("Dropping undecodable frame ({} bytes): {e}", jpeg.len());
            return None;
        }
    };
    if img.width() > max.0 || img.height() > max.1 {
        Some(img.thumbnail(max.0, max.1))
    } else {
        Some(img)
    }
}

// ── frame iterator ───────────────────────────────────────────────────────

/// Decoded frames from an MJPEG byte stream.
///
/// Ends when the stream closes, a read fails, or the stop flag is set
/// (checked before every read).  Not restartable.
pub struct MjpegFrames<R> {
    reader: R,
    splitter: FrameSplitter,
    chunk: Vec<u8>,
    stop: Arc<AtomicBool>,
    display: (u32, u32),
    done: bool,
}

impl<R: Read> MjpegFrames<R> {
    pub fn new(reader: R, stop: Arc<AtomicBool>) -> Self {
        Self {
            reader,
            splitter: FrameSplitter::new(),
            chunk: vec![0; CHUNK_SIZE],
            stop,
            display: DISPLAY_SIZE,
            done: false,
        }
    }

    /// Shrink frames to fit `width`×`height` instead of [`DISPLAY_SIZE`].
    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        self.display = (width, height);
        self
    }
}

impl<R: Read> Iterator for MjpegFrames<R> {
    type Item = DynamicImage;

    fn next(&mut self) -> Option<DynamicImage> {
        loop {
            while let Some(jpeg) = self.splitter.next_frame() {
                if let Some(img) = decode_frame(&jpeg, self.display) {
                    return Some(img);
                }
            }

            if self.done || self.stop.load(Ordering::Relaxed) {
                self.done = true;
                return None;
            }

            match self.reader.read(&mut self.chunk) {
                Ok(0) => {
                    debug!("MJPEG stream closed");
                    self.done = true;
                }
                Ok(n) => self.splitter.push(&self.chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("MJPEG stream read failed: {e}");
                    self.done = true;
                }
            }
        }
    }
}
