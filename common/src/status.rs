//! Printer status fetcher – one query against Moonraker's object API,
//! normalized into a [`StatusRecord`].
//!
//! The public [`fetch`] never fails: any transport, HTTP, or decode
//! problem comes back as [`StatusRecord::error`].  [`fetch_status`]
//! keeps the cause for callers that care.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Request timeout for the status query.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Progress below this is too small to extrapolate a remaining time from.
const MIN_PROGRESS_FOR_ESTIMATE: f64 = 0.01;

const QUERY_PATH: &str = "/printer/objects/query?print_stats&display_status&virtual_sdcard";

// ── printer state ────────────────────────────────────────────────────────

/// State reported by `print_stats.state`, plus `Error` for failed polls
/// and `Unknown` for anything unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrinterState {
    Standby,
    Printing,
    Paused,
    Complete,
    Cancelled,
    Error,
    Unknown,
}

impl PrinterState {
    /// Parse Moonraker's state string.
    pub fn parse(s: &str) -> Self {
        match s {
            "standby" => Self::Standby,
            "printing" => Self::Printing,
            "paused" => Self::Paused,
            "complete" => Self::Complete,
            "cancelled" => Self::Cancelled,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Printing => "printing",
            Self::Paused => "paused",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── status record ────────────────────────────────────────────────────────

/// One normalized poll result.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub state: PrinterState,
    /// Fraction complete.  Usually 0.0..=1.0 but not clamped.
    pub progress: f64,
    pub filename: String,
    /// Seconds spent printing so far.
    pub print_duration: f64,
}

impl StatusRecord {
    /// The degraded record every failed poll collapses to.
    pub fn error() -> Self {
        Self {
            state: PrinterState::Error,
            progress: 0.0,
            filename: String::new(),
            print_duration: 0.0,
        }
    }

    /// Seconds remaining, extrapolated linearly from elapsed time.
    ///
    /// Zero unless printing with more than 1% done.  Noisy early in a print.
    pub fn time_left(&self) -> f64 {
        if self.state == PrinterState::Printing && self.progress > MIN_PROGRESS_FOR_ESTIMATE {
            let total = self.print_duration / self.progress;
            total - self.print_duration
        } else {
            0.0
        }
    }
}

// ── errors ───────────────────────────────────────────────────────────────

/// Why a status poll failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("printer host returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed status response: {0}")]
    Decode(#[from] serde_json::Error),
}

// ── wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResult {
    status: ObjectStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ObjectStatus {
    print_stats: PrintStats,
    display_status: ProgressGroup,
    virtual_sdcard: ProgressGroup,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrintStats {
    state: Option<String>,
    filename: String,
    print_duration: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProgressGroup {
    progress: f64,
}

/// Normalize a raw query response body.
pub fn parse_status(body: &[u8]) -> Result<StatusRecord, FetchError> {
    let resp: QueryResponse = serde_json::from_slice(body)?;
    let status = resp.result.status;

    let state = status
        .print_stats
        .state
        .as_deref()
        .map(PrinterState::parse)
        .unwrap_or(PrinterState::Standby);

    // virtual_sdcard is the more accurate source, but only when it has
    // started counting.
    let mut progress = status.virtual_sdcard.progress;
    if progress == 0.0 {
        progress = status.display_status.progress;
    }

    Ok(StatusRecord {
        state,
        progress,
        filename: status.print_stats.filename,
        print_duration: status.print_stats.print_duration.max(0.0),
    })
}

// ── HTTP ─────────────────────────────────────────────────────────────────

/// Build the HTTP client used for status polls.
pub fn build_client() -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
}

/// Query the printer host once, keeping the failure cause.
pub fn fetch_status(
    client: &reqwest::blocking::Client,
    base_url: &str,
) -> Result<StatusRecord, FetchError> {
    let url = format!("{}{QUERY_PATH}", base_url.trim_end_matches('/'));
    let resp = client.get(&url).send().map_err(FetchError::Request)?;

    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status()));
    }

    let body = resp.bytes().map_err(FetchError::Request)?;
    parse_status(&body)
}

/// Query the printer host once.  Never fails; errors become
/// [`StatusRecord::error`].
pub fn fetch(client: &reqwest::blocking::Client, base_url: &str) -> StatusRecord {
    match fetch_status(client, base_url) {
        Ok(record) => record,
        Err(e) => {
            debug!("Status poll failed: {e}");
            StatusRecord::error()
        }
    }
}
