//! Debounced presenter – redraws the tray only when the state changes or
//! progress moves by more than half a percent.

use tracing::debug;

use crate::glyph;
use crate::status::{PrinterState, StatusRecord};
use crate::summary::DisplaySummary;
use crate::tray::TraySurface;

/// Progress changes at or below this do not trigger a redraw.
pub const PROGRESS_EPSILON: f64 = 0.005;

/// What the tray currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenterState {
    pub state: PrinterState,
    pub progress: f64,
}

impl Default for PresenterState {
    fn default() -> Self {
        Self {
            state: PrinterState::Unknown,
            progress: 0.0,
        }
    }
}

impl PresenterState {
    /// Whether a sample differs enough from what is shown.
    pub fn should_redraw(&self, state: PrinterState, progress: f64) -> bool {
        state != self.state || (progress - self.progress).abs() > PROGRESS_EPSILON
    }
}

/// Owns the last-shown state and the surface it draws on.
pub struct Presenter<S> {
    shown: PresenterState,
    surface: S,
}

impl<S: TraySurface> Presenter<S> {
    pub fn new(surface: S) -> Self {
        Self {
            shown: PresenterState::default(),
            surface,
        }
    }

    /// Show `record` if it differs enough from the last redraw.
    /// Returns whether the surface was updated.
    pub fn present(&mut self, record: &StatusRecord, summary: &DisplaySummary) -> bool {
        if !self.shown.should_redraw(record.state, record.progress) {
            return false;
        }

        debug!(
            "Redraw: {} {:.3} -> {} {:.3}",
            self.shown.state, self.shown.progress, record.state, record.progress
        );
        let icon = glyph::render(record.state, record.progress);
        self.surface.update(&icon, &summary.tooltip);
        self.shown = PresenterState {
            state: record.state,
            progress: record.progress,
        };
        true
    }

    pub fn shown(&self) -> PresenterState {
        self.shown
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::summarize;
    use image::RgbaImage;

    #[derive(Default)]
    struct Recorder {
        tooltips: Vec<String>,
    }

    impl TraySurface for Recorder {
        fn update(&mut self, _glyph: &RgbaImage, tooltip: &str) {
            self.tooltips.push(tooltip.to_string());
        }
    }

    fn record(state: PrinterState, progress: f64) -> StatusRecord {
        StatusRecord {
            state,
            progress,
            filename: "part.gcode".into(),
            print_duration: 100.0,
        }
    }

    #[test]
    fn test_should_redraw() {
        let prev = PresenterState {
            state: PrinterState::Printing,
            progress: 0.5,
        };
        assert!(!prev.should_redraw(PrinterState::Printing, 0.5));
        assert!(!prev.should_redraw(PrinterState::Printing, 0.504));
        assert!(!prev.should_redraw(PrinterState::Printing, 0.496));
        assert!(prev.should_redraw(PrinterState::Printing, 0.506));
        assert!(prev.should_redraw(PrinterState::Paused, 0.5));
    }

    #[test]
    fn test_initial_state_is_sentinel() {
        let shown = PresenterState::default();
        assert_eq!(shown.state, PrinterState::Unknown);
        assert_eq!(shown.progress, 0.0);
    }

    #[test]
    fn test_present_debounces() {
        let mut presenter = Presenter::new(Recorder::default());
        let now = chrono::Local::now();

        let r = record(PrinterState::Printing, 0.10);
        assert!(presenter.present(&r, &summarize(&r, now)));

        let r = record(PrinterState::Printing, 0.103);
        assert!(!presenter.present(&r, &summarize(&r, now)));
        assert_eq!(presenter.shown().progress, 0.10);

        let r = record(PrinterState::Printing, 0.12);
        assert!(presenter.present(&r, &summarize(&r, now)));

        let r = record(PrinterState::Paused, 0.12);
        assert!(presenter.present(&r, &summarize(&r, now)));

        let tooltips = &presenter.surface().tooltips;
        assert_eq!(tooltips.len(), 3);
        assert!(tooltips[0].starts_with("Printing: 10%"));
        assert_eq!(tooltips[2], "Status: Paused");
    }

    #[test]
    fn test_unknown_sentinel_suppresses_identical_unknown() {
        let mut presenter = Presenter::new(Recorder::default());
        let r = record(PrinterState::Unknown, 0.0);
        assert!(!presenter.present(&r, &summarize(&r, chrono::Local::now())));
    }
}
