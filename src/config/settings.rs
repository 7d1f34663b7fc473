//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every default below matches the ReSpeaker 4-mic array setup the tracker
//! was built around; the framing constants are load-bearing — change them
//! only together with the array firmware configuration.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::doa::Algorithm;

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Capture and segmentation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Stream sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channels delivered by the device.
    pub physical_channels: usize,
    /// Channels fed to the estimator (interleave offsets `1..=used`).
    pub used_channels: usize,
    /// Frames per capture block (per channel).
    pub block_size: usize,
    /// Half the analysis-window length; a segment holds `2 ×` this.
    pub segment_half_len: usize,
    /// Samples carried across segment boundaries.
    pub overlap_len: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            physical_channels: 6,
            used_channels: 4,
            block_size: 1_024,
            segment_half_len: 500,
            overlap_len: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// DoaConfig
// ---------------------------------------------------------------------------

/// Estimation parameters handed through to the bearing estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoaConfig {
    /// STFT window length (hop is `nfft / 2`).
    pub nfft: usize,
    /// Propagation speed in m/s.
    pub speed_of_sound: f64,
    /// Frequency band scored by the bundled estimator, in Hz.
    pub freq_range_hz: (f64, f64),
    /// Azimuth grid resolution of the bundled estimator.
    pub grid_points: usize,
}

impl Default for DoaConfig {
    fn default() -> Self {
        Self {
            nfft: 256,
            speed_of_sound: 343.0,
            freq_range_hz: (300.0, 3_500.0),
            grid_points: 360,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// `threshold_db` is the only runtime-mutable value (via
/// `DoaProcessor::set_threshold`); everything else is fixed at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Case-sensitive substring matched against input device names.
    pub device_filter: String,
    /// Loudness gate in dB; segments quieter than this skip estimation.
    /// Recommended range 20–120.
    pub threshold_db: i32,
    /// Bearing algorithm identifier passed to the estimator.
    pub algorithm: Algorithm,
    pub audio: AudioConfig,
    pub doa: DoaConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_filter: "ReSpeaker 4 Mic Array".into(),
            threshold_db: 50,
            algorithm: Algorithm::NormMusic,
            audio: AudioConfig::default(),
            doa: DoaConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    /// Returns defaults when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject framing constants that the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let a = &self.audio;
        if a.used_channels >= a.physical_channels {
            bail!(
                "used channels ({}) must be fewer than physical channels ({})",
                a.used_channels,
                a.physical_channels
            );
        }
        if a.overlap_len >= 2 * a.segment_half_len {
            bail!(
                "overlap ({}) must be shorter than the segment ({})",
                a.overlap_len,
                2 * a.segment_half_len
            );
        }
        if self.doa.nfft > 2 * a.segment_half_len {
            bail!(
                "nfft ({}) cannot exceed the segment length ({})",
                self.doa.nfft,
                2 * a.segment_half_len
            );
        }
        if !(20..=120).contains(&self.threshold_db) {
            log::warn!(
                "gate threshold {} dB is outside the recommended 20–120 dB range",
                self.threshold_db
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    /// Default values match the array setup.
    #[test]
    fn default_values_match_array_setup() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.device_filter, "ReSpeaker 4 Mic Array");
        assert_eq!(cfg.threshold_db, 50);
        assert_eq!(cfg.algorithm, Algorithm::NormMusic);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.physical_channels, 6);
        assert_eq!(cfg.audio.used_channels, 4);
        assert_eq!(cfg.audio.block_size, 1_024);
        assert_eq!(cfg.audio.segment_half_len, 500);
        assert_eq!(cfg.audio.overlap_len, 50);
        assert_eq!(cfg.doa.nfft, 256);
        assert_eq!(cfg.doa.speed_of_sound, 343.0);
        assert_eq!(cfg.doa.grid_points, 360);
    }

    /// Modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.device_filter = "USB Audio".into();
        cfg.threshold_db = 65;
        cfg.algorithm = Algorithm::Srp;
        cfg.audio.segment_half_len = 400;
        cfg.doa.grid_points = 720;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.device_filter, "USB Audio");
        assert_eq!(loaded.threshold_db, 65);
        assert_eq!(loaded.algorithm, Algorithm::Srp);
        assert_eq!(loaded.audio.segment_half_len, 400);
        assert_eq!(loaded.doa.grid_points, 720);
    }

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_framing() {
        let mut cfg = AppConfig::default();
        cfg.audio.used_channels = 6;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.audio.overlap_len = 1_000;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.doa.nfft = 2_048;
        assert!(cfg.validate().is_err());
    }
}
