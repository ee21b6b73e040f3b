//! Display summary – turns a [`StatusRecord`] into the tooltip text shown
//! next to the tray glyph.

use chrono::{DateTime, Local, TimeDelta};

use crate::status::{PrinterState, StatusRecord};

/// Filenames longer than this are shortened.
const FILENAME_MAX_CHARS: usize = 25;
/// How many trailing characters survive shortening.
const FILENAME_TAIL_CHARS: usize = 22;

/// Tooltip shown for failed polls and printer-side errors alike.
pub const ERROR_TOOLTIP: &str = "Connection Error / Printer Error";

/// Display-ready view of one poll.
///
/// The headless tray only shows `tooltip`; `percent`, `time_left_secs` and
/// `eta` are there for tray backends that render them separately (a
/// progress label, a notification on completion).
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySummary {
    /// Whole percent complete, 0..=100.
    pub percent: u8,
    pub tooltip: String,
    /// Extrapolated seconds remaining (0 when unknown).
    pub time_left_secs: f64,
    /// Estimated wall-clock finish time, when printing.
    pub eta: Option<DateTime<Local>>,
}

/// Build the display summary for `record` as of `now`.
pub fn summarize(record: &StatusRecord, now: DateTime<Local>) -> DisplaySummary {
    let percent = (record.progress * 100.0).floor().clamp(0.0, 100.0) as u8;

    match record.state {
        PrinterState::Printing => {
            let time_left = record.time_left();
            let eta = TimeDelta::try_milliseconds((time_left * 1000.0) as i64)
                .and_then(|d| now.checked_add_signed(d));
            let eta_str = eta
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "?".into());

            let tooltip = format!(
                "Printing: {percent}%\nLeft: {} (ETA: {eta_str})\n{}",
                format_time_left(time_left),
                shorten_filename(&record.filename),
            );

            DisplaySummary {
                percent,
                tooltip,
                time_left_secs: time_left,
                eta,
            }
        }
        PrinterState::Error => DisplaySummary {
            percent,
            tooltip: ERROR_TOOLTIP.to_string(),
            time_left_secs: 0.0,
            eta: None,
        },
        state => DisplaySummary {
            percent,
            tooltip: format!("Status: {}", capitalize(state.as_str())),
            time_left_secs: 0.0,
            eta: None,
        },
    }
}

/// `"{h}h {m}m"` for an hour or more, `"{m}m"` otherwise, `"?"` when
/// negative.
pub fn format_time_left(seconds: f64) -> String {
    if seconds.is_nan() || seconds < 0.0 {
        return "?".into();
    }
    let total_min = seconds as u64 / 60;
    let (h, m) = (total_min / 60, total_min % 60);
    if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

/// Keep the tail of long filenames; it is usually the part that tells
/// prints apart.
pub fn shorten_filename(name: &str) -> String {
    let len = name.chars().count();
    if len > FILENAME_MAX_CHARS {
        let tail: String = name.chars().skip(len - FILENAME_TAIL_CHARS).collect();
        format!("...{tail}")
    } else {
        name.to_string()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
