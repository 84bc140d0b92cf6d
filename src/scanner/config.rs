//! Scanner configuration.
//!
//! Defaults favour the common case of a student holding a phone up to
//! a printed code: back camera, VGA frames, ten samples per second.

use crate::camera::{DevicePreference, FacingHint, Resolution};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Camera selection and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Explicit device identifier; overrides `facing`.
    pub device_id: Option<String>,
    /// Preferred facing.
    pub facing: Option<FacingHint>,
    /// Ideal frame width in pixels.
    pub width: u32,
    /// Ideal frame height in pixels.
    pub height: u32,
    /// Release the camera once a scan has been verified.
    pub close_on_success: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            facing: Some(FacingHint::Back),
            width: 640,
            height: 480,
            close_on_success: true,
        }
    }
}

impl CameraConfig {
    /// The device preference these settings describe.
    pub fn preference(&self) -> DevicePreference {
        DevicePreference {
            device_id: self.device_id.clone(),
            facing: self.facing,
        }
    }

    /// The requested resolution.
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Frame sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Milliseconds between samples.
    pub interval_ms: u64,
    /// Frames larger than this on either side are downscaled before decoding.
    pub max_decode_dimension: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            max_decode_dimension: crate::decode::DEFAULT_MAX_DIMENSION,
        }
    }
}

impl SamplingConfig {
    /// The sampling period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Upper bound on one verification call.
    pub timeout_ms: u64,
    /// How long a code that failed parsing or verification is ignored.
    pub rescan_cooldown_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            rescan_cooldown_ms: 2000,
        }
    }
}

impl VerificationConfig {
    /// The verification timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The rescan cooldown.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.rescan_cooldown_ms)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
    /// Offline status directory used by the demo binary.
    pub directory: Option<PathBuf>,
}

/// Full configuration file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Camera selection and resolution.
    #[serde(default)]
    pub camera: CameraConfig,
    /// Sampling cadence and decode sizing.
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Verification deadline and rescan cooldown.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// Metrics and demo directory.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("sampling interval must be positive")]
    InvalidInterval,
    #[error("verification timeout must be positive")]
    InvalidTimeout,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl ScannerConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.sampling.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.verification.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// Parses and validates TOML configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScannerConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml_str(&content)
    }
}
