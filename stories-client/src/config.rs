//! Configuration for the stories client.

use std::time::Duration;
use stories_core::playback::{PlaybackConfig, DEFAULT_IMAGE_DURATION, DEFAULT_TICK_INTERVAL};
use thiserror::Error;

/// Name shown for authors without a profile.
pub const DEFAULT_FALLBACK_NAME: &str = "Unknown user";

/// Default capacity of the viewer command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

const IMAGE_DURATION_VAR: &str = "STORIES_IMAGE_DURATION_MS";
const TICK_INTERVAL_VAR: &str = "STORIES_TICK_INTERVAL_MS";
const FALLBACK_NAME_VAR: &str = "STORIES_FALLBACK_NAME";

/// Errors from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidMillis { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

/// Configuration for a stories session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoriesConfig {
    /// Image duration and tick spacing for the viewer.
    pub playback: PlaybackConfig,

    /// Display name used when an author has no profile.
    pub fallback_display_name: String,

    /// Capacity of the viewer command channel.
    pub command_buffer: usize,
}

impl Default for StoriesConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StoriesConfig {
    /// Create a config with the default timings.
    pub fn new() -> Self {
        Self {
            playback: PlaybackConfig {
                image_duration: DEFAULT_IMAGE_DURATION,
                tick_interval: DEFAULT_TICK_INTERVAL,
            },
            fallback_display_name: DEFAULT_FALLBACK_NAME.to_string(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }

    /// Read overrides from the environment (and a `.env` file if present).
    ///
    /// Recognized variables:
    /// - `STORIES_IMAGE_DURATION_MS`
    /// - `STORIES_TICK_INTERVAL_MS`
    /// - `STORIES_FALLBACK_NAME`
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(ms) = parse_millis(IMAGE_DURATION_VAR, lookup(IMAGE_DURATION_VAR))? {
            config.playback.image_duration = ms;
        }
        if let Some(ms) = parse_millis(TICK_INTERVAL_VAR, lookup(TICK_INTERVAL_VAR))? {
            config.playback.tick_interval = ms;
        }
        if let Some(name) = lookup(FALLBACK_NAME_VAR).filter(|n| !n.trim().is_empty()) {
            config.fallback_display_name = name;
        }

        Ok(config)
    }

    /// Set how long images stay on screen.
    pub fn with_image_duration(mut self, duration: Duration) -> Self {
        self.playback.image_duration = duration;
        self
    }

    /// Set the tick spacing. Clamped to at least one millisecond.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.playback.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the name used for authors without a profile.
    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_display_name = name.into();
        self
    }

    /// Set the viewer command channel capacity. Clamped to at least one.
    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity.max(1);
        self
    }
}

fn parse_millis(var: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let ms: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidMillis {
        var,
        value: value.clone(),
    })?;
    if ms == 0 {
        return Err(ConfigError::Zero { var });
    }
    Ok(Some(Duration::from_millis(ms)))
}
