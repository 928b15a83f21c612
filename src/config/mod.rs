//! Configuration types for mask generation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::masks::pulse::{MissingFloorPolicy, NOISE_FLOOR_DB};

/// Errors that can occur while reading or writing a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration for the Sv threshold mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Build this mask in a configured mask set
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Cells strictly above this Sv (dB re 1 m^-1) are signal
    #[serde(default = "default_threshold_db")]
    pub threshold_db: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_threshold_db() -> f64 {
    -75.0
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold_db: default_threshold_db(),
        }
    }
}

/// Configuration for the transmit pulse / near-field mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Background noise level (dB re 1 m^-1)
    #[serde(default = "default_noise_level_db")]
    pub noise_level_db: f64,

    /// Handling of pings that never reach the noise level
    #[serde(default)]
    pub on_missing_floor: MissingFloorPolicy,
}

fn default_noise_level_db() -> f64 {
    NOISE_FLOOR_DB
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            noise_level_db: default_noise_level_db(),
            on_missing_floor: MissingFloorPolicy::default(),
        }
    }
}

/// Configuration for the impulse noise mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum rise above both vertical neighbours (dB)
    #[serde(default = "default_impulse_threshold_db")]
    pub threshold_db: f64,
}

fn default_impulse_threshold_db() -> f64 {
    10.0
}

impl Default for ImpulseConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold_db: default_impulse_threshold_db(),
        }
    }
}

/// Configuration for echogram rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Sv mapped to the bottom of the colour ramp
    #[serde(default = "default_vmin_db")]
    pub vmin_db: f64,

    /// Sv mapped to the top of the colour ramp
    #[serde(default = "default_vmax_db")]
    pub vmax_db: f64,

    /// Image width in pixels
    #[serde(default = "default_plot_width")]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_plot_height")]
    pub height: u32,
}

fn default_vmin_db() -> f64 {
    -90.0
}

fn default_vmax_db() -> f64 {
    -30.0
}

fn default_plot_width() -> u32 {
    1600
}

fn default_plot_height() -> u32 {
    900
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            vmin_db: default_vmin_db(),
            vmax_db: default_vmax_db(),
            width: default_plot_width(),
            height: default_plot_height(),
        }
    }
}

/// Mask generator settings, one section per generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    #[serde(default)]
    pub threshold: ThresholdConfig,

    #[serde(default)]
    pub pulse: PulseConfig,

    #[serde(default)]
    pub impulse: ImpulseConfig,
}

/// Main configuration combining all sub-configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub masks: MaskConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
