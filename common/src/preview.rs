//! Live camera preview: a background thread decodes MJPEG frames and
//! hands them to the display-owning thread through a single-slot,
//! newest-wins [`LatestFrame`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::mjpeg::MjpegFrames;
use crate::poll::StopSignal;
use crate::webcam;

/// Connect timeout for the camera stream.  Reads have none.
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How often the display loop re-checks the stop signal.
const DISPLAY_POLL: Duration = Duration::from_millis(200);

/// Something that can show preview frames, each replacing the last.
pub trait PreviewSurface {
    fn show(&mut self, frame: &DynamicImage);
}

// ── latest-frame slot ────────────────────────────────────────────────────

struct Slot<T> {
    value: Option<T>,
    closed: bool,
}

/// Single-slot handoff: posting replaces any frame not yet taken.
pub struct LatestFrame<T> {
    inner: Arc<(Mutex<Slot<T>>, Condvar)>,
}

impl<T> Clone for LatestFrame<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for LatestFrame<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(Slot {
                    value: None,
                    closed: false,
                }),
                Condvar::new(),
            )),
        }
    }
}

impl<T> LatestFrame<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish `value`, dropping any frame the consumer has not taken yet.
    pub fn post(&self, value: T) {
        self.slot().value = Some(value);
        self.inner.1.notify_one();
    }

    /// Mark the producer as finished.
    pub fn close(&self) {
        self.slot().closed = true;
        self.inner.1.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.slot().closed
    }

    /// Take the pending frame, if any, without waiting.
    pub fn take(&self) -> Option<T> {
        self.slot().value.take()
    }

    /// Wait up to `timeout` for a frame.  Returns `None` on timeout or
    /// once the producer has closed and nothing is pending.
    pub fn wait_take(&self, timeout: Duration) -> Option<T> {
        let mut slot = self.slot();
        if slot.value.is_none() && !slot.closed {
            slot = match self.inner.1.wait_timeout_while(slot, timeout, |s| {
                s.value.is_none() && !s.closed
            }) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        slot.value.take()
    }
}

/// Show frames from `frames` on `surface` until the producer closes the
/// slot or `stop` is raised.  Runs on the thread that owns `surface`.
/// Returns the number of frames shown.
pub fn drive<S: PreviewSurface>(
    frames: &LatestFrame<DynamicImage>,
    surface: &mut S,
    stop: &StopSignal,
) -> usize {
    let mut shown = 0;
    while !stop.is_stopped() {
        match frames.wait_take(DISPLAY_POLL) {
            Some(frame) => {
                surface.show(&frame);
                shown += 1;
            }
            None if frames.is_closed() => break,
            None => {}
        }
    }
    shown
}

// ── streaming session ────────────────────────────────────────────────────

/// A running preview stream.  Dropping it asks the thread to stop.
pub struct PreviewSession {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PreviewSession {
    /// Locate the camera under `base_url` and start streaming into `frames`.
    pub fn start(base_url: &str, frames: LatestFrame<DynamicImage>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(STREAM_CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .context("Cannot create HTTP client")?;
        let stream_url = webcam::locate_stream(&client, base_url);
        Self::start_url(client, stream_url, frames)
    }

    /// Stream a known MJPEG URL into `frames`.
    pub fn start_url(
        client: reqwest::blocking::Client,
        stream_url: String,
        frames: LatestFrame<DynamicImage>,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = std::thread::Builder::new()
            .name("preview".into())
            .spawn(move || {
                stream_frames(&client, &stream_url, &frames, thread_stop);
                frames.close();
            })
            .context("Cannot spawn preview thread")?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Ask the stream thread to stop after its current read.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stop and wait for the thread.  Blocks while a read is stalled.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stream_frames(
    client: &reqwest::blocking::Client,
    url: &str,
    frames: &LatestFrame<DynamicImage>,
    stop: Arc<AtomicBool>,
) {
    info!("Opening webcam stream {url}");
    let resp = match client.get(url).send() {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            warn!("Webcam stream returned {}", r.status());
            return;
        }
        Err(e) => {
            warn!("Cannot open webcam stream: {e}");
            return;
        }
    };

    let mut count = 0u64;
    for frame in MjpegFrames::new(resp, stop) {
        frames.post(frame);
        count += 1;
    }
    debug!("Webcam stream ended after {count} frames");
}
