//! Application configuration
//!
//! Read from `config.toml` in the platform config directory. Every section
//! and key is optional; missing values take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};

/// Environment override for the remote base URL
pub const API_URL_ENV: &str = "OVERLAY_API_URL";

/// Sample streams offered to operators
pub const SAMPLE_STREAMS: &[(&str, &str)] = &[
    (
        "Big Buck Bunny (HLS)",
        "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8",
    ),
    (
        "Sintel (HLS)",
        "https://bitdash-a.akamaihd.net/content/sintel/hls/playlist.m3u8",
    ),
    (
        "Tears of Steel (HLS)",
        "https://demo.unified-streaming.com/k8s/features/stable/video/tears-of-steel/tears-of-steel.ism/.m3u8",
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub ui: UiConfig,
    pub stream: StreamConfig,
    pub canvas: CanvasConfig,
}

/// Remote CRUD authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub health_interval_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 10,
            health_interval_secs: HEALTH_INTERVAL_SECS,
        }
    }
}

/// Local control API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub bind_address: String,
    pub http_port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Playback defaults, used until remote settings arrive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub default_url: String,
    pub volume: f32,
    pub auto_play: bool,
    pub controls_hide_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_url: SAMPLE_STREAMS[0].1.to_string(),
            volume: DEFAULT_VOLUME,
            auto_play: false,
            controls_hide_ms: CONTROLS_HIDE_MS,
        }
    }
}

/// Initial container bounds for overlay geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

impl AppConfig {
    /// Path of `config.toml`, if the platform has a config directory
    pub fn path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "overlay-studio")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from disk, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let mut config = match Self::path() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)?;
                tracing::info!("Loaded config from {}", path.display());
                Self::from_toml(&raw)?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.remote.base_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot schedule
    pub fn validate(&self) -> Result<()> {
        if self.remote.health_interval_secs == 0 {
            return Err(Error::Config(
                "remote.health_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.stream.controls_hide_ms == 0 {
            return Err(Error::Config(
                "stream.controls_hide_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Write to the platform config directory
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()
            .ok_or_else(|| Error::Config("no config directory available".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [remote]
            base_url = "http://api.internal:9000/api"

            [canvas]
            width = 1920.0
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.base_url, "http://api.internal:9000/api");
        assert_eq!(config.remote.request_timeout_secs, 10);
        assert_eq!(config.canvas.width, 1920.0);
        assert_eq!(config.canvas.height, DEFAULT_CANVAS_HEIGHT);
        assert_eq!(config.ui.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.stream.volume, DEFAULT_VOLUME);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        match AppConfig::from_toml("remote = 5") {
            Err(Error::Config(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_default_stream_is_adaptive_sample() {
        let config = AppConfig::default();
        assert!(config.stream.default_url.contains(".m3u8"));
        let text = config.to_toml().unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        for raw in [
            "[remote]\nhealth_interval_secs = 0",
            "[stream]\ncontrols_hide_ms = 0",
        ] {
            match AppConfig::from_toml(raw) {
                Err(Error::Config(msg)) => assert!(msg.contains("at least 1")),
                other => panic!("unexpected: {:?}", other),
            }
        }
    }

    #[test]
    fn test_save_to_round_trips() {
        let dir = std::env::temp_dir().join(format!("overlay-studio-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let mut config = AppConfig::default();
        config.ui.http_port = 9191;
        config.save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(AppConfig::from_toml(&raw).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
