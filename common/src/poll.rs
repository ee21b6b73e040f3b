//! Status poll loop – fetch, summarize, present, wait; until stopped.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::presenter::Presenter;
use crate::status::{self, StatusRecord};
use crate::summary;
use crate::tray::TraySurface;

// ── stop signal ──────────────────────────────────────────────────────────

/// Process-wide stop flag that also wakes sleepers.
///
/// Cloning shares the same flag.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every waiter.
    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *flag(lock) = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *flag(&self.inner.0)
    }

    /// Sleep for `timeout` or until [`stop`](Self::stop) is called.
    /// Returns `true` if stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut stopped = flag(lock);

        while !*stopped {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            stopped = match cvar.wait_timeout(stopped, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        *stopped
    }
}

/// A poisoned flag is still a valid bool.
fn flag(lock: &Mutex<bool>) -> MutexGuard<'_, bool> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}

// ── poll loop ────────────────────────────────────────────────────────────

/// Lifecycle of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Drives fetch → summarize → present on an interval.
pub struct PollLoop<S> {
    client: reqwest::blocking::Client,
    base_url: String,
    interval: Duration,
    presenter: Presenter<S>,
    stop: StopSignal,
    /// Whether the last poll failed.
    failing: bool,
}

impl<S: TraySurface> PollLoop<S> {
    pub fn new(
        base_url: &str,
        interval: Duration,
        surface: S,
        stop: StopSignal,
    ) -> Result<Self> {
        let client = status::build_client().context("Cannot create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            interval,
            presenter: Presenter::new(surface),
            stop,
            failing: false,
        })
    }

    /// Run one fetch/present cycle.  Returns whether the tray was redrawn.
    pub fn tick(&mut self) -> bool {
        let record = match status::fetch_status(&self.client, &self.base_url) {
            Ok(record) => {
                if self.failing {
                    info!("Printer host reachable again");
                }
                self.failing = false;
                record
            }
            Err(e) => {
                // Only the first failure of a streak is worth a warning.
                if self.failing {
                    debug!("Status poll failed: {e}");
                } else {
                    warn!("Status poll failed: {e}");
                }
                self.failing = true;
                StatusRecord::error()
            }
        };
        let summary = summary::summarize(&record, chrono::Local::now());
        self.presenter.present(&record, &summary)
    }

    /// Poll until the stop signal is raised.
    pub fn run(mut self) -> LoopState {
        info!(
            "Polling {} every {:.1}s",
            self.base_url,
            self.interval.as_secs_f64()
        );

        let mut state = LoopState::Running;
        while state == LoopState::Running {
            if self.stop.is_stopped() {
                state = LoopState::Stopped;
                continue;
            }
            if self.tick() {
                debug!("Tray updated ({})", self.presenter.shown().state);
            }
            if self.stop.wait_timeout(self.interval) {
                state = LoopState::Stopped;
            }
        }

        info!("Polling loop stopped");
        state
    }
}

impl<S: TraySurface + Send + 'static> PollLoop<S> {
    /// Run the loop on its own `poll` thread.
    pub fn spawn(self) -> Result<JoinHandle<LoopState>> {
        std::thread::Builder::new()
            .name("poll".into())
            .spawn(move || self.run())
            .context("Cannot spawn poll thread")
    }
}
