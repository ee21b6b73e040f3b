//! Webcam stream discovery via Moonraker's webcam list.
//!
//! Falls back to the conventional mjpg-streamer path whenever the list is
//! empty, unreachable, or holds no MJPEG-capable camera.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

const LIST_TIMEOUT: Duration = Duration::from_secs(2);

/// Services whose `stream_url` serves multipart MJPEG.
pub const MJPEG_SERVICES: &[&str] = &["mjpegstreamer", "mjpegstreamer-adaptive", "uv4l-mjpeg"];

/// One entry of `/server/webcams/list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebcamEntry {
    pub name: String,
    pub enabled: bool,
    pub service: String,
    pub stream_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListResponse {
    result: ListResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListResult {
    webcams: Vec<WebcamEntry>,
}

/// Stream URL used when discovery yields nothing usable.
pub fn fallback_url(base_url: &str) -> String {
    format!("{}/webcam/?action=stream", base_url.trim_end_matches('/'))
}

/// Resolve a camera's `stream_url` against the host base URL.
pub fn resolve_stream_url(base_url: &str, stream_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if stream_url.starts_with("http://") || stream_url.starts_with("https://") {
        stream_url.to_string()
    } else if stream_url.starts_with('/') {
        format!("{base}{stream_url}")
    } else {
        format!("{base}/{stream_url}")
    }
}

/// First enabled camera with an MJPEG-capable service.
pub fn select_camera(webcams: &[WebcamEntry]) -> Option<&WebcamEntry> {
    webcams
        .iter()
        .find(|cam| cam.enabled && MJPEG_SERVICES.contains(&cam.service.as_str()))
}

/// First enabled MJPEG camera, resolved to a full URL.
pub fn select_stream(base_url: &str, webcams: &[WebcamEntry]) -> Option<String> {
    select_camera(webcams).map(|cam| resolve_stream_url(base_url, &cam.stream_url))
}

fn list_webcams(client: &reqwest::blocking::Client, base_url: &str) -> Result<Vec<WebcamEntry>> {
    let url = format!("{}/server/webcams/list", base_url.trim_end_matches('/'));
    let resp = client
        .get(&url)
        .timeout(LIST_TIMEOUT)
        .send()
        .context("GET /server/webcams/list")?;

    if !resp.status().is_success() {
        anyhow::bail!("GET /server/webcams/list returned {}", resp.status());
    }

    let body = resp.bytes().context("Read webcam list")?;
    let list: ListResponse = serde_json::from_slice(&body).context("Parse webcam list JSON")?;
    Ok(list.result.webcams)
}

/// Find the stream URL of the active camera.  Never fails.
pub fn locate_stream(client: &reqwest::blocking::Client, base_url: &str) -> String {
    let webcams = match list_webcams(client, base_url) {
        Ok(w) => w,
        Err(e) => {
            debug!("Webcam discovery failed, using fallback: {e:#}");
            return fallback_url(base_url);
        }
    };

    match select_camera(&webcams) {
        Some(cam) => {
            let url = resolve_stream_url(base_url, &cam.stream_url);
            info!("Using webcam '{}' at {url}", cam.name);
            url
        }
        None => {
            debug!(
                "No enabled MJPEG webcam among {} entries, using fallback",
                webcams.len()
            );
            fallback_url(base_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::tests::{dead_url, mock_server};

    const BASE: &str = "http://printer.local";

    fn cam(enabled: bool, service: &str, stream_url: &str) -> WebcamEntry {
        WebcamEntry {
            name: stream_url.trim_matches('/').into(),
            enabled,
            service: service.into(),
            stream_url: stream_url.into(),
        }
    }

    #[test]
    fn test_skips_disabled_entry() {
        let cams = [
            cam(false, "mjpegstreamer", "/first/?action=stream"),
            cam(true, "mjpegstreamer", "/second/?action=stream"),
        ];
        assert_eq!(
            select_stream(BASE, &cams).as_deref(),
            Some("http://printer.local/second/?action=stream")
        );
    }

    #[test]
    fn test_select_camera_by_name() {
        let cams = [
            cam(true, "webrtc-camerastreamer", "nozzle"),
            cam(true, "mjpegstreamer-adaptive", "bed"),
            cam(true, "uv4l-mjpeg", "chamber"),
        ];
        assert_eq!(select_camera(&cams).map(|c| c.name.as_str()), Some("bed"));
        assert_eq!(select_camera(&[]).map(|c| c.name.as_str()), None);
    }

    #[test]
    fn test_skips_incompatible_service() {
        let cams = [cam(true, "webrtc-camerastreamer", "/webrtc")];
        assert_eq!(select_stream(BASE, &cams), None);
    }

    #[test]
    fn test_resolve_stream_url() {
        assert_eq!(
            resolve_stream_url(BASE, "http://10.0.0.9:8080/stream"),
            "http://10.0.0.9:8080/stream"
        );
        assert_eq!(
            resolve_stream_url("http://printer.local/", "/webcam/?action=stream"),
            "http://printer.local/webcam/?action=stream"
        );
        assert_eq!(
            resolve_stream_url(BASE, "webcam2/?action=stream"),
            "http://printer.local/webcam2/?action=stream"
        );
    }

    #[test]
    fn test_locate_from_list() {
        let body = r#"{"result":{"webcams":[
            {"name":"nozzle","enabled":false,"service":"mjpegstreamer","stream_url":"/nozzle/?action=stream"},
            {"name":"bed","enabled":true,"service":"mjpegstreamer","stream_url":"/bed/?action=stream"}
        ]}}"#;
        let url = mock_server(200, body);
        let client = reqwest::blocking::Client::new();
        assert_eq!(locate_stream(&client, &url), format!("{url}/bed/?action=stream"));
    }

    #[test]
    fn test_locate_empty_list_falls_back() {
        let url = mock_server(200, r#"{"result":{"webcams":[]}}"#);
        let client = reqwest::blocking::Client::new();
        assert_eq!(locate_stream(&client, &url), fallback_url(&url));
    }

    #[test]
    fn test_locate_unreachable_falls_back() {
        let base = dead_url();
        let client = reqwest::blocking::Client::new();
        assert_eq!(
            locate_stream(&client, &base),
            format!("{base}/webcam/?action=stream")
        );
    }
}
