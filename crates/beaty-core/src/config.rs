use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BeatyError, Result};
use crate::types::QueryMode;

/// Top-level configuration for the Beaty client.
///
/// Loaded from `~/.beaty/config.toml` by default. Every section falls back to
/// its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeatyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub bubble: BubbleConfig,
}

impl BeatyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BeatyConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the session pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.reveal.tick_ms == 0 {
            return Err(BeatyError::Config("reveal.tick_ms must be > 0".into()));
        }
        if self.reveal.chars_per_tick == 0 {
            return Err(BeatyError::Config(
                "reveal.chars_per_tick must be > 0".into(),
            ));
        }
        if self.camera.settle_timeout_ms == 0 {
            return Err(BeatyError::Config(
                "camera.settle_timeout_ms must be > 0".into(),
            ));
        }
        if !(0.0..=24.0).contains(&self.camera.fixed_zoom)
            || !(0.0..=24.0).contains(&self.camera.max_zoom)
        {
            return Err(BeatyError::Config(
                "camera zoom levels must be within 0..=24".into(),
            ));
        }
        if !self.api.query_path.starts_with('/') {
            return Err(BeatyError::Config(format!(
                "api.query_path must start with '/': {}",
                self.api.query_path
            )));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Query endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme, host and port of the assistant service.
    pub base_url: String,
    /// Path of the streaming query endpoint.
    pub query_path: String,
    pub mode: QueryMode,
    /// Session token sent as `Authorization: Bearer <token>`.
    pub token: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            query_path: "/query".to_string(),
            mode: QueryMode::Real,
            token: None,
            connect_timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn query_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.query_path
        )
    }
}

/// Typewriter reveal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Interval between reveal ticks.
    pub tick_ms: u64,
    /// Characters revealed per tick.
    pub chars_per_tick: usize,
    /// Shown while the server is working; replaced by the first real text.
    pub placeholder: String,
    /// The only error text a user ever sees.
    pub error_message: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            chars_per_tick: 1,
            placeholder: "🐝 Beaty is thinking…".to_string(),
            error_message: "Oops, something went wrong. Could you ask me again?".to_string(),
        }
    }
}

impl RevealConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Padding around fitted bounds, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgePadding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Default for EdgePadding {
    fn default() -> Self {
        Self {
            top: 100,
            bottom: 100,
            left: 50,
            right: 50,
        }
    }
}

/// Camera movement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Zoom used when centering on a single marker.
    pub fixed_zoom: f64,
    /// Upper zoom bound when fitting several markers.
    pub max_zoom: f64,
    pub animation_ms: u64,
    /// How long a gated reveal waits for the settle signal before starting anyway.
    pub settle_timeout_ms: u64,
    pub padding: EdgePadding,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fixed_zoom: 15.0,
            max_zoom: 15.0,
            animation_ms: 1000,
            settle_timeout_ms: 5000,
            padding: EdgePadding::default(),
        }
    }
}

impl CameraConfig {
    pub fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

/// How the response bubble is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Over the map; hides itself after a while.
    #[default]
    Floating,
    /// Docked in a side panel; stays until replaced.
    Panel,
}

/// Response bubble settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    pub presentation: Presentation,
    /// Delay before a floating bubble hides once its text is fully shown.
    pub auto_dismiss_ms: u64,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            presentation: Presentation::Floating,
            auto_dismiss_ms: 10_000,
        }
    }
}

impl BubbleConfig {
    pub fn auto_dismiss(&self) -> Option<Duration> {
        match self.presentation {
            Presentation::Floating => Some(Duration::from_millis(self.auto_dismiss_ms)),
            Presentation::Panel => None,
        }
    }
}
