//! Tray glyph rendering – a ring whose color tracks the printer state
//! and whose arc tracks print progress.

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::status::PrinterState;

/// Glyph edge length in pixels.
pub const GLYPH_SIZE: u32 = 64;
const MARGIN: f32 = 4.0;
const STROKE: f32 = 6.0;

const BACKGROUND: Rgba<u8> = Rgba([200, 200, 200, 50]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// What gets drawn over the background ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Foreground {
    /// Clockwise arc from 12 o'clock spanning this many degrees.
    Arc(f32),
    FullRing,
}

/// Foreground color for `state`.
pub fn state_color(state: PrinterState) -> Rgba<u8> {
    match state {
        PrinterState::Printing => Rgba([0, 255, 127, 255]), // spring green
        PrinterState::Paused => Rgba([255, 120, 0, 255]),   // orange
        PrinterState::Complete => Rgba([0, 191, 255, 255]), // deep sky blue
        PrinterState::Error => Rgba([220, 20, 60, 255]),    // crimson
        PrinterState::Standby | PrinterState::Cancelled | PrinterState::Unknown => {
            Rgba([169, 169, 169, 255]) // dark gray
        }
    }
}

/// Foreground shape for `state`; `None` when printing at exactly 0%.
///
/// Only printing has a meaningful sweep, every other state gets the
/// full ring regardless of `progress`.
pub fn foreground(state: PrinterState, progress: f64) -> Option<Foreground> {
    if state != PrinterState::Printing {
        return Some(Foreground::FullRing);
    }
    let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    if progress > 0.0 {
        Some(Foreground::Arc(360.0 * progress as f32))
    } else {
        None
    }
}

/// Render the 64×64 glyph for `state` at `progress`.
pub fn render(state: PrinterState, progress: f64) -> RgbaImage {
    let fg = foreground(state, progress);
    let color = state_color(state);

    let center = GLYPH_SIZE as f32 / 2.0;
    let outer = center - MARGIN;
    let inner = outer - STROKE;

    ImageBuffer::from_fn(GLYPH_SIZE, GLYPH_SIZE, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < inner || dist > outer {
            return TRANSPARENT;
        }

        let covered = match fg {
            Some(Foreground::FullRing) => true,
            Some(Foreground::Arc(sweep)) => clockwise_from_top(dx, dy) <= sweep,
            None => false,
        };
        if covered {
            color
        } else {
            BACKGROUND
        }
    })
}

/// Angle in degrees, clockwise from 12 o'clock, in `0.0..360.0`.
/// Image y grows downward, so `atan2` already turns clockwise.
fn clockwise_from_top(dx: f32, dy: f32) -> f32 {
    (dy.atan2(dx).to_degrees() + 90.0).rem_euclid(360.0)
}
