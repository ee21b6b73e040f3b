//! Klipper Tray – polls a Moonraker host and shows print progress as a
//! ring glyph with a tooltip.
//!
//! Usage:
//!   klipper-tray [CONFIG]                 tray mode
//!   klipper-tray --preview X Y [CONFIG]   webcam preview popup at X,Y
//!
//! This binary runs headless: the tray glyph is written to `icon_path`
//! and preview frames to `preview_path` (see `config.json`).

mod surfaces;

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use klipper_tray_common::config::{self, Config};
use klipper_tray_common::glyph;
use klipper_tray_common::poll::{PollLoop, StopSignal};
use klipper_tray_common::preview::{self, LatestFrame, PreviewSession};
use klipper_tray_common::status::PrinterState;
use klipper_tray_common::tray::{self, ChannelTray, MenuAction, TraySurface};

use surfaces::{IconFile, PreviewFile};

/// How often the tray owner checks for menu events between updates.
const EVENT_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Tray { config: PathBuf },
    Preview { x: i32, y: i32, config: PathBuf },
}

fn parse_args(args: &[String]) -> Result<Mode> {
    let default_config = || PathBuf::from(Config::default_path());

    match args.first().map(String::as_str) {
        Some("--preview") => {
            let x = args
                .get(1)
                .context("--preview needs X and Y")?
                .parse()
                .context("Invalid X coordinate")?;
            let y = args
                .get(2)
                .context("--preview needs X and Y")?
                .parse()
                .context("Invalid Y coordinate")?;
            let config = args.get(3).map(PathBuf::from).unwrap_or_else(default_config);
            Ok(Mode::Preview { x, y, config })
        }
        Some(path) => Ok(Mode::Tray {
            config: PathBuf::from(path),
        }),
        None => Ok(Mode::Tray {
            config: default_config(),
        }),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        Mode::Tray { config } => {
            let config = config::load(&config).context("Config load failed")?;
            run_tray(&config)
        }
        Mode::Preview { x, y, config } => {
            let config = config::load(&config).context("Config load failed")?;
            run_preview(&config, (x, y))
        }
    }
}

// ── tray mode ────────────────────────────────────────────────────────────

fn run_tray(config: &Config) -> Result<()> {
    info!("Klipper Tray starting (moonraker_url={})", config.base_url());

    let mut icon = IconFile::new(config.icon_path.clone());
    icon.update(
        &glyph::render(PrinterState::Standby, 0.0),
        tray::CONNECTING_TOOLTIP,
    );
    let labels: Vec<&str> = tray::menu().iter().map(|item| item.label).collect();
    info!("Tray menu: {}", labels.join(", "));

    // ── ctrl-c → Exit ────────────────────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<MenuAction>();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received");
        let _ = event_tx.send(MenuAction::Exit);
    })
    .context("Cannot set Ctrl-C handler")?;

    // ── poll thread ──────────────────────────────────────────────────
    let stop = StopSignal::new();
    let (surface, updates) = ChannelTray::new();
    let poll = PollLoop::new(
        config.base_url(),
        config.update_interval(),
        surface,
        stop.clone(),
    )?
    .spawn()?;

    // ── tray owner loop ──────────────────────────────────────────────
    loop {
        match updates.recv_timeout(EVENT_POLL) {
            Ok(update) => icon.apply(&update),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Ok(action) = event_rx.try_recv() {
            if handle_action(action, config) {
                break;
            }
        }
    }

    stop.stop();
    poll.join().ok();
    info!("Klipper Tray stopped");
    Ok(())
}

/// React to a menu action.  Returns `true` when the tray should exit.
///
/// Headless mode only ever sees `Exit` (from Ctrl-C); a real tray backend
/// also posts `OpenDashboard` from its menu.
fn handle_action(action: MenuAction, config: &Config) -> bool {
    match action {
        MenuAction::Exit => true,
        MenuAction::OpenDashboard => {
            info!("Open {} in a browser", config.base_url());
            false
        }
    }
}

// ── preview mode ─────────────────────────────────────────────────────────

fn run_preview(config: &Config, position: (i32, i32)) -> Result<()> {
    info!(
        "Webcam preview starting at ({}, {}) for {}",
        position.0,
        position.1,
        config.base_url()
    );

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received");
        handler_stop.stop();
    })
    .context("Cannot set Ctrl-C handler")?;

    let frames = LatestFrame::new();
    let session = PreviewSession::start(config.base_url(), frames.clone())
        .context("Cannot start webcam preview")?;

    let mut surface = PreviewFile::new(config.preview_path.clone(), position);
    let shown = preview::drive(&frames, &mut surface, &stop);
    session.stop();

    if shown == 0 && !stop.is_stopped() {
        anyhow::bail!("Webcam stream delivered no frames");
    }
    info!("Webcam preview closed after {shown} frames");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_mode_is_tray() {
        assert_eq!(
            parse_args(&[]).unwrap(),
            Mode::Tray {
                config: PathBuf::from("config.json")
            }
        );
    }

    #[test]
    fn test_tray_with_config() {
        assert_eq!(
            parse_args(&args(&["/etc/klipper-tray.toml"])).unwrap(),
            Mode::Tray {
                config: PathBuf::from("/etc/klipper-tray.toml")
            }
        );
    }

    #[test]
    fn test_preview_mode() {
        assert_eq!(
            parse_args(&args(&["--preview", "1200", "-40"])).unwrap(),
            Mode::Preview {
                x: 1200,
                y: -40,
                config: PathBuf::from("config.json")
            }
        );
    }

    #[test]
    fn test_preview_needs_coordinates() {
        assert!(parse_args(&args(&["--preview", "10"])).is_err());
        assert!(parse_args(&args(&["--preview", "ten", "20"])).is_err());
    }

    #[test]
    fn test_menu_actions() {
        let config = Config::default();
        assert!(handle_action(MenuAction::Exit, &config));
        assert!(!handle_action(MenuAction::OpenDashboard, &config));
    }
}
