//! Core of the Klipper tray indicator: status polling, debounced glyph
//! presentation, and the MJPEG webcam preview.

pub mod config;
pub mod glyph;
pub mod mjpeg;
pub mod poll;
pub mod presenter;
pub mod preview;
pub mod status;
pub mod summary;
pub mod tray;
pub mod webcam;
