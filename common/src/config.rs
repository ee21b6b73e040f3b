//! Configuration loading – reads the tray's `config.json` (or a TOML
//! file with the same keys).
//!
//! A missing file is not an error: the tray starts with defaults so a
//! fresh install still shows a glyph.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

const DEFAULT_MOONRAKER_URL: &str = "http://mainsail.local";
const DEFAULT_UPDATE_INTERVAL: f64 = 2.0;
/// Longest accepted poll interval (one day).
const MAX_UPDATE_INTERVAL: f64 = 86_400.0;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // ── printer host ─────────────────────────────────────────────────
    /// Base URL of the Moonraker API (also opened by "Open Mainsail").
    pub moonraker_url: String,
    /// Seconds between status polls.
    pub update_interval_seconds: f64,

    // ── headless surfaces ────────────────────────────────────────────
    /// Where the current tray glyph is written as PNG.
    pub icon_path: PathBuf,
    /// Where the latest preview frame is written.
    pub preview_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            moonraker_url: DEFAULT_MOONRAKER_URL.to_string(),
            update_interval_seconds: DEFAULT_UPDATE_INTERVAL,
            icon_path: PathBuf::from("klipper-tray.png"),
            preview_path: PathBuf::from("klipper-preview.jpg"),
        }
    }
}

impl Config {
    /// Default config path, relative to the working directory.
    pub fn default_path() -> &'static str {
        "config.json"
    }

    /// Poll interval as a [`Duration`].
    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_interval_seconds)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_UPDATE_INTERVAL))
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.moonraker_url.trim_end_matches('/')
    }

    fn normalize(mut self) -> Self {
        self.moonraker_url = self.base_url().to_string();
        if !(self.update_interval_seconds.is_finite() && self.update_interval_seconds > 0.0) {
            warn!(
                "update_interval_seconds={} is not positive, using {}s",
                self.update_interval_seconds, DEFAULT_UPDATE_INTERVAL
            );
            self.update_interval_seconds = DEFAULT_UPDATE_INTERVAL;
        } else if self.update_interval_seconds > MAX_UPDATE_INTERVAL {
            warn!(
                "update_interval_seconds={} is too large, using {}s",
                self.update_interval_seconds, MAX_UPDATE_INTERVAL
            );
            self.update_interval_seconds = MAX_UPDATE_INTERVAL;
        }
        self
    }
}

/// Load the configuration at `path`.
///
/// Files ending in `.toml` are parsed as TOML, everything else as JSON.
/// Unknown keys are ignored and absent keys take their defaults.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(Config::default().normalize());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))?;

    let config = parse(&text, is_toml(path))
        .with_context(|| format!("Cannot parse config: {}", path.display()))?;
    info!("Loaded config from {}", path.display());

    Ok(config.normalize())
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

fn parse(text: &str, toml: bool) -> Result<Config> {
    if toml {
        Ok(toml::from_str(text)?)
    } else {
        Ok(serde_json::from_str(text)?)
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let text = r#"{"moonraker_url": "http://voron.lan/", "update_interval_seconds": 5}"#;
        let config = parse(text, false).unwrap().normalize();
        assert_eq!(config.moonraker_url, "http://voron.lan");
        assert_eq!(config.update_interval(), Duration::from_secs(5));
        assert_eq!(config.icon_path, PathBuf::from("klipper-tray.png"));
    }

    #[test]
    fn test_parse_toml() {
        let text = "moonraker_url = \"http://ender.local\"\nupdate_interval_seconds = 0.5\n";
        let config = parse(text, true).unwrap().normalize();
        assert_eq!(config.base_url(), "http://ender.local");
        assert_eq!(config.update_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_non_positive_interval_falls_back() {
        let config = parse(r#"{"update_interval_seconds": 0}"#, false)
            .unwrap()
            .normalize();
        assert_eq!(config.update_interval_seconds, 2.0);
    }

    #[test]
    fn test_huge_interval_is_clamped() {
        let config = parse(r#"{"update_interval_seconds": 1e20}"#, false)
            .unwrap()
            .normalize();
        assert_eq!(config.update_interval(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_unnormalized_interval_does_not_panic() {
        let config = Config {
            update_interval_seconds: 1e20,
            ..Config::default()
        };
        assert_eq!(config.update_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.moonraker_url, "http://mainsail.local");
        assert_eq!(config.update_interval_seconds, 2.0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"moonraker_url": "http://10.0.0.7:7125"}"#).unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.base_url(), "http://10.0.0.7:7125");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load(&path).is_err());
    }
}
