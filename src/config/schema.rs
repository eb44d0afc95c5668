use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/encore/config.toml` or `~/.config/encore/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ENCORE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub catalog: CatalogSettings,
    pub playback: PlaybackSettings,
    pub controls: ControlsSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// How often `timeUpdate` is broadcast while playing (milliseconds).
    /// Natural end of a track is detected on the same cadence.
    pub time_update_interval_ms: u64,
    /// Gain applied when the engine starts, in `[0, 1]`.
    pub initial_volume: f32,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            time_update_interval_ms: 250,
            initial_volume: 1.0,
            quit_fade_out_ms: 500,
        }
    }
}

impl EngineSettings {
    pub fn time_update_interval(&self) -> Duration {
        Duration::from_millis(self.time_update_interval_ms.max(1))
    }

    pub fn quit_fade_out(&self) -> Duration {
        Duration::from_millis(self.quit_fade_out_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Scheme, host and optional prefix of the catalog service.
    pub base_url: String,
    /// `GET {base_url}{stream_path}/{track_id}` returns the raw audio bytes.
    pub stream_path: String,
    /// `POST {base_url}{play_count_path}/{track_id}` bumps the play counter.
    pub play_count_path: String,
    /// Timeout applied to every catalog request (milliseconds).
    pub request_timeout_ms: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            stream_path: "/api/songs/stream".to_string(),
            play_count_path: "/api/songs/play".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl CatalogSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Whether repeat starts enabled.
    pub repeat: bool,
    /// Number of recently played tracks kept for "previous".
    pub history_limit: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: false,
            history_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
    /// Volume change per `+` / `-` key press.
    pub volume_step: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            scrub_seconds: 5,
            volume_step: 0.05,
        }
    }
}
