//! # Scene Configuration
//!
//! Configuration types for a [`Scene`](crate::ecs::Scene) and its clock.
//! Both types load from TOML or RON through the [`Config`] trait; every field
//! has a default so partial files are accepted.
//!
//! ```toml
//! name = "level_1"
//!
//! [time]
//! max_delta = 0.25
//! scale = 0.5
//! ```

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// Smallest delta the clock will report, in seconds
pub const DEFAULT_MIN_DELTA: f64 = 0.000_001;

/// Largest delta the clock will report, in seconds
pub const DEFAULT_MAX_DELTA: f64 = 1.0;

/// Default fixed step (60 Hz)
pub const DEFAULT_FIXED_DELTA: f64 = 1.0 / 60.0;

/// # Time Configuration
///
/// Clamp bounds, scale and fixed step for the scene clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Lower clamp for the per-frame delta (seconds)
    pub min_delta: f64,
    /// Upper clamp for the per-frame delta (seconds)
    pub max_delta: f64,
    /// Unscaled fixed step (seconds)
    pub fixed_delta: f64,
    /// Time scale applied to delta and fixed delta
    pub scale: f64,
    /// FPS reported before the first sample window completes
    pub initial_fps: f64,
    /// Length of the FPS sample window (seconds)
    pub fps_sample_interval: f64,
}

impl TimeConfig {
    /// Set the delta clamp bounds
    pub fn with_delta_bounds(mut self, min_delta: f64, max_delta: f64) -> Self {
        self.min_delta = min_delta;
        self.max_delta = max_delta;
        self
    }

    /// Set the time scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the unscaled fixed step
    pub fn with_fixed_delta(mut self, fixed_delta: f64) -> Self {
        self.fixed_delta = fixed_delta;
        self
    }

    /// Validate the configuration
    ///
    /// NaN fails every check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delta.is_nan() || self.min_delta <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_delta must be positive, got {}",
                self.min_delta
            )));
        }
        if self.max_delta.is_nan() || self.max_delta < self.min_delta {
            return Err(ConfigError::Invalid(format!(
                "max_delta ({}) is below min_delta ({})",
                self.max_delta, self.min_delta
            )));
        }
        if self.scale.is_nan() || self.scale < 0.0 {
            return Err(ConfigError::Invalid(format!("scale must not be negative, got {}", self.scale)));
        }
        if self.fps_sample_interval.is_nan() || self.fps_sample_interval <= 0.0 {
            return Err(ConfigError::Invalid("fps_sample_interval must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            min_delta: DEFAULT_MIN_DELTA,
            max_delta: DEFAULT_MAX_DELTA,
            fixed_delta: DEFAULT_FIXED_DELTA,
            scale: 1.0,
            initial_fps: 60.0,
            fps_sample_interval: 1.0,
        }
    }
}

impl Config for TimeConfig {}

/// # Scene Configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Scene name, empty for an unnamed scene
    pub name: String,
    /// Clock settings
    pub time: TimeConfig,
}

impl SceneConfig {
    /// Create a configuration for a named scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: TimeConfig::default(),
        }
    }

    /// Replace the clock settings
    pub fn with_time(mut self, time: TimeConfig) -> Self {
        self.time = time;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.time.validate()
    }
}

impl Config for SceneConfig {}
