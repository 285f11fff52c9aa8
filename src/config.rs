/// Application configuration
///
/// Loaded once at startup from a JSON file. Every field has a default so a
/// missing or partial file still yields a usable configuration; the rig must
/// come up even when the operator never touched `config.json`.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CameraConfig {
    /// Force the simulated camera even when rpicam tooling is present
    pub simulated: bool,
    /// Manual shutter time range in microseconds
    pub exposure_range_us: [u32; 2],
    /// Initial manual shutter time in microseconds
    pub initial_exposure_us: u32,
    /// Abort a frame acquisition that takes longer than this
    pub capture_timeout_secs: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            simulated: false,
            exposure_range_us: [100, 800_000],
            initial_exposure_us: 10_000,
            capture_timeout_secs: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UiConfig {
    pub window_title: String,
    pub fullscreen: bool,
    /// Default interval span in meters used for automatic advancement
    pub default_segment_length: f64,
    /// Step applied by the +/- depth buttons, meters
    pub segment_adjustment_step: f64,
    /// How often the storage indicator refreshes, seconds
    pub storage_refresh_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_title: "Stereo Core Camera System".to_string(),
            fullscreen: true,
            default_segment_length: 0.5,
            segment_adjustment_step: 0.05,
            storage_refresh_secs: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Authoritative storage root; photos land here first
    pub internal_path: PathBuf,
    /// Candidate roots under which USB sticks get mounted
    pub usb_mount_paths: Vec<PathBuf>,
    /// Free-space warning thresholds, megabytes
    pub low_space_warning_mb: u64,
    pub critical_space_warning_mb: u64,
    /// JPEG quality for persisted images (1-100)
    pub image_quality: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let internal_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("core_photos");
        Self {
            internal_path,
            usb_mount_paths: vec![PathBuf::from("/media/pi"), PathBuf::from("/mnt/usb")],
            low_space_warning_mb: 1000,
            critical_space_warning_mb: 500,
            image_quality: 95,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file is not an error: the rig runs on defaults. A file that
    /// exists but fails to parse is reported, since silently ignoring a typo
    /// in the thresholds would be worse than refusing to start.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with.
    fn validate(&self) -> Result<()> {
        if self.ui.default_segment_length <= 0.0 {
            return Err(CoreError::Config(
                "default_segment_length must be positive".to_string(),
            ));
        }
        if self.ui.segment_adjustment_step <= 0.0 {
            return Err(CoreError::Config(
                "segment_adjustment_step must be positive".to_string(),
            ));
        }
        if self.storage.image_quality == 0 || self.storage.image_quality > 100 {
            return Err(CoreError::Config(
                "image_quality must be in 1..=100".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ui.default_segment_length, 0.5);
        assert_eq!(config.camera.initial_exposure_us, 10_000);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let json = r#"{ "storage": { "image_quality": 80 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.storage.image_quality, 80);
        // untouched sections keep their defaults
        assert_eq!(config.storage.low_space_warning_mb, 1000);
        assert_eq!(config.ui.segment_adjustment_step, 0.05);
    }

    #[test]
    fn test_bad_quality_rejected() {
        let mut config = Config::default();
        config.storage.image_quality = 0;
        assert!(config.validate().is_err());
        config.storage.image_quality = 101;
        assert!(config.validate().is_err());
    }
}
