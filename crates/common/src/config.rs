//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SIGNPOSE_CONFIG";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default landmark extraction settings.
    pub extraction: ExtractionDefaults,

    /// Default visualization settings.
    pub rendering: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// ffmpeg binary used for decoding and encoding.
    pub ffmpeg_path: String,

    /// ffprobe binary used for stream metadata.
    pub ffprobe_path: String,
}

/// Default extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionDefaults {
    /// Target sampling rate (frames per second). Zero or negative keeps every frame.
    pub target_fps: f64,

    /// Rate assumed when the source does not report one.
    pub fallback_fps: f64,

    /// Stop after this many sampled frames. Zero means no limit.
    pub max_frames: Option<usize>,

    /// External landmark detector process.
    pub detector: DetectorConfig,
}

/// Sidecar detector invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Executable to spawn. Empty means "not configured".
    pub command: String,

    /// Arguments passed to the executable.
    pub args: Vec<String>,
}

/// Default visualization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Output frame rate.
    pub fps: u32,

    /// Canvas width in pixels.
    pub width: u32,

    /// Canvas height in pixels.
    pub height: u32,

    /// Draw pose and hand skeleton connections in addition to points.
    pub draw_connections: bool,

    /// Skip groups that the presence mask marks as not detected.
    pub skip_undetected: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "signpose=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionDefaults::default(),
            rendering: RenderDefaults::default(),
            logging: LoggingConfig::default(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for ExtractionDefaults {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            fallback_fps: 30.0,
            max_frames: None,
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 640,
            height: 480,
            draw_connections: false,
            skip_undetected: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl DetectorConfig {
    pub fn is_configured(&self) -> bool {
        !self.command.trim().is_empty()
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the given location.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(explicit);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("signpose").join("config.json")
}
