//! Headless display surfaces: the tray glyph and preview frames are
//! written to files and the tooltip goes to the log.

use std::path::PathBuf;

use image::{DynamicImage, RgbaImage};
use tracing::{debug, info, warn};

use klipper_tray_common::preview::PreviewSurface;
use klipper_tray_common::tray::{TraySurface, TrayUpdate};

/// Tray icon stand-in owned by the main thread.
pub struct IconFile {
    path: PathBuf,
    tooltip: String,
}

impl IconFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            tooltip: String::new(),
        }
    }

    /// Apply an update forwarded from the poll thread.
    pub fn apply(&mut self, update: &TrayUpdate) {
        match update {
            TrayUpdate::Redraw { glyph, tooltip } => self.update(glyph, tooltip),
        }
    }
}

impl TraySurface for IconFile {
    fn update(&mut self, glyph: &RgbaImage, tooltip: &str) {
        if let Err(e) = glyph.save(&self.path) {
            warn!("Cannot write tray icon {}: {e}", self.path.display());
        }
        if tooltip != self.tooltip {
            info!("{}", tooltip.replace('\n', " | "));
            self.tooltip = tooltip.to_string();
        }
    }
}

/// Preview window stand-in: keeps the latest frame on disk.
pub struct PreviewFile {
    path: PathBuf,
    position: (i32, i32),
}

impl PreviewFile {
    pub fn new(path: PathBuf, position: (i32, i32)) -> Self {
        Self { path, position }
    }
}

impl PreviewSurface for PreviewFile {
    fn show(&mut self, frame: &DynamicImage) {
        // JPEG has no alpha channel.
        if let Err(e) = frame.to_rgb8().save(&self.path) {
            warn!("Cannot write preview frame {}: {e}", self.path.display());
            return;
        }
        debug!(
            "Preview {}x{} at ({}, {})",
            frame.width(),
            frame.height(),
            self.position.0,
            self.position.1
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klipper_tray_common::glyph;
    use klipper_tray_common::status::PrinterState;

    #[test]
    fn test_icon_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");

        let mut icon = IconFile::new(path.clone());
        icon.apply(&TrayUpdate::Redraw {
            glyph: glyph::render(PrinterState::Paused, 0.0),
            tooltip: "Status: Paused".into(),
        });

        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (64, 64));
        assert_eq!(icon.tooltip, "Status: Paused");
    }

    #[test]
    fn test_preview_file_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");

        let mut preview = PreviewFile::new(path.clone(), (10, 20));
        preview.show(&DynamicImage::new_rgb8(32, 24));

        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (32, 24));
    }
}
