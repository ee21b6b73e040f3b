//! Tray surface interface, update channel, and context menu.
//!
//! The OS tray icon is owned by one thread (on some platforms it must be
//! the main thread).  The poll loop never touches it directly: it writes
//! through a [`TraySurface`], and [`ChannelTray`] forwards those writes as
//! [`TrayUpdate`]s to whoever owns the real icon.

use std::sync::mpsc;

use image::RgbaImage;

/// Something that can show a glyph and a tooltip.
pub trait TraySurface {
    fn update(&mut self, glyph: &RgbaImage, tooltip: &str);
}

/// Updates sent from the poll loop to the tray owner.
#[derive(Debug, Clone)]
pub enum TrayUpdate {
    /// Replace the icon and tooltip.
    Redraw { glyph: RgbaImage, tooltip: String },
}

/// [`TraySurface`] that forwards every update over a channel.
pub struct ChannelTray {
    tx: mpsc::Sender<TrayUpdate>,
}

impl ChannelTray {
    /// Create the surface and the receiver the tray owner drains.
    pub fn new() -> (Self, mpsc::Receiver<TrayUpdate>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl TraySurface for ChannelTray {
    fn update(&mut self, glyph: &RgbaImage, tooltip: &str) {
        // A closed receiver means the tray is gone; the stop signal will
        // catch up with the poll loop shortly.
        let _ = self.tx.send(TrayUpdate::Redraw {
            glyph: glyph.clone(),
            tooltip: tooltip.to_string(),
        });
    }
}

// ── menu ─────────────────────────────────────────────────────────────────

/// Actions offered by the tray context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Open the web dashboard (default action on click).
    OpenDashboard,
    /// Stop polling and quit.
    Exit,
}

/// A single menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
    /// Triggered by a plain click on the icon.
    pub default: bool,
}

/// The context menu, top to bottom.
pub fn menu() -> Vec<MenuItem> {
    vec![
        MenuItem {
            label: "Open Mainsail",
            action: MenuAction::OpenDashboard,
            default: true,
        },
        MenuItem {
            label: "Exit",
            action: MenuAction::Exit,
            default: false,
        },
    ]
}

/// Initial tooltip, before the first poll completes.
pub const CONNECTING_TOOLTIP: &str = "Connecting...";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_layout() {
        let items = menu();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "Open Mainsail");
        assert!(items[0].default);
        assert_eq!(items[1].action, MenuAction::Exit);
        assert_eq!(items.iter().filter(|i| i.default).count(), 1);
    }

    #[test]
    fn test_channel_tray_forwards() {
        let (mut tray, rx) = ChannelTray::new();
        let glyph = RgbaImage::new(4, 4);
        tray.update(&glyph, "Status: Standby");

        let TrayUpdate::Redraw { glyph: got, tooltip } = rx.recv().unwrap();
        assert_eq!(tooltip, "Status: Standby");
        assert_eq!(got.dimensions(), (4, 4));
    }

    #[test]
    fn test_channel_tray_survives_closed_receiver() {
        let (mut tray, rx) = ChannelTray::new();
        drop(rx);
        tray.update(&RgbaImage::new(1, 1), "x");
    }
}
