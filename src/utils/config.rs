use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::beat_detector::RatePolicy;
use crate::core::signal_buffer::signal_capacity;
use crate::shared::constants;
use crate::utils::file_utils;

/// Tunables for capture, detection and presentation.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulserConfig {
    pub camera_index: i32,
    pub camera_fps: u32,
    pub target_fps: u32,
    pub viewport_width: f64,
    pub line_size: f64,
    pub measurement_window_secs: f64,
    pub rate_policy: RatePolicy,
    pub contact_brightness_threshold: f64,
    pub contact_volatility_threshold: f64,
    /// LED class device under /sys/class/leds used as the torch
    pub torch_led: Option<String>,
}

impl Default for PulserConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            camera_fps: constants::CAMERA_FRAMES_PER_SECOND,
            target_fps: constants::IMAGES_PER_SECOND,
            viewport_width: constants::VIEWPORT_WIDTH,
            line_size: constants::LINE_SIZE,
            measurement_window_secs: constants::MEASUREMENT_WINDOW_SECS,
            rate_policy: RatePolicy::default(),
            contact_brightness_threshold: constants::CONTACT_BRIGHTNESS_THRESHOLD,
            contact_volatility_threshold: constants::CONTACT_VOLATILITY_THRESHOLD,
            torch_led: None,
        }
    }
}

impl PulserConfig {
    /// Load from an explicit path, or the first config file found in the
    /// working directory then the user config directory, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::candidate_paths().into_iter().find(|p| p.exists()),
        };

        let Some(path) = path else {
            crate::utils::logger::debug("No config file found, using defaults");
            return Ok(Self::default());
        };

        let config = Self::from_file(&path)?;
        crate::utils::logger::info(&format!("Loaded config from {}", path.display()));
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = file_utils::read_file(path)?;
        let config: Self = serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        file_utils::write_file(path, (json + "\n").as_bytes())
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(constants::CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(constants::CONFIG_DIR_NAME).join(constants::CONFIG_DIR_FILE));
        }
        paths
    }

    /// Replace values that would stall or break the pipeline with defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.camera_fps == 0 {
            self.camera_fps = defaults.camera_fps;
        }
        if self.target_fps == 0 {
            self.target_fps = defaults.target_fps;
        }
        if !(self.line_size.is_finite() && self.line_size > 0.0) {
            self.line_size = defaults.line_size;
        }
        if !(self.viewport_width.is_finite() && self.viewport_width > 0.0) {
            self.viewport_width = defaults.viewport_width;
        }
        if signal_capacity(self.viewport_width, self.line_size) < constants::MIN_DETECTION_SAMPLES {
            crate::utils::logger::error(&format!(
                "Viewport {} / line size {} leaves too few samples to detect beats, using defaults",
                self.viewport_width, self.line_size
            ));
            self.viewport_width = defaults.viewport_width;
            self.line_size = defaults.line_size;
        }
        if window_duration(self.measurement_window_secs).is_none() {
            crate::utils::logger::error(&format!(
                "Measurement window of {}s is out of range, using {}s",
                self.measurement_window_secs, defaults.measurement_window_secs
            ));
            self.measurement_window_secs = defaults.measurement_window_secs;
        }
        self
    }

    /// Measurement window length, the default when the configured value is unusable
    pub fn measurement_window(&self) -> Duration {
        window_duration(self.measurement_window_secs)
            .unwrap_or_else(|| Duration::from_secs_f64(constants::MEASUREMENT_WINDOW_SECS))
    }
}

fn window_duration(secs: f64) -> Option<Duration> {
    if secs <= 0.0 || secs > constants::MAX_MEASUREMENT_WINDOW_SECS {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::PipelineConfig;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("pulser_config_test");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let path = temp_path("partial.json");
        fs::write(&path, r#"{ "measurement_window_secs": 15.0, "rate_policy": "cumulative" }"#).unwrap();

        let config = PulserConfig::load(Some(&path)).unwrap();
        assert_eq!(config.measurement_window_secs, 15.0);
        assert_eq!(config.rate_policy, RatePolicy::Cumulative);
        assert_eq!(config.camera_fps, constants::CAMERA_FRAMES_PER_SECOND);
        assert_eq!(config.line_size, constants::LINE_SIZE);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("saved.json");
        let config = PulserConfig {
            camera_index: 2,
            torch_led: Some("white:flash".to_string()),
            ..PulserConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PulserConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_values_are_sanitized() {
        let path = temp_path("bad_values.json");
        fs::write(
            &path,
            r#"{ "camera_fps": 0, "line_size": -1.0, "measurement_window_secs": 0.0 }"#,
        )
        .unwrap();
        let config = PulserConfig::from_file(&path).unwrap();
        assert_eq!(config, PulserConfig::default());
    }

    #[test]
    fn test_oversized_window_falls_back_to_default() {
        let path = temp_path("huge_window.json");
        fs::write(&path, r#"{ "measurement_window_secs": 1e20 }"#).unwrap();
        let config = PulserConfig::from_file(&path).unwrap();
        assert_eq!(config.measurement_window_secs, constants::MEASUREMENT_WINDOW_SECS);

        let pipeline = PipelineConfig::from(&config);
        assert_eq!(pipeline.window, Duration::from_secs(10));

        // Unsanitized values never reach Duration arithmetic either
        for secs in [1e20, 1e19, f64::INFINITY, f64::NAN, -5.0] {
            let raw = PulserConfig { measurement_window_secs: secs, ..PulserConfig::default() };
            assert_eq!(raw.measurement_window(), Duration::from_secs(10));
        }
    }

    #[test]
    fn test_viewport_too_narrow_to_detect_is_reset() {
        let path = temp_path("narrow_viewport.json");
        fs::write(&path, r#"{ "viewport_width": 6.0, "line_size": 3.0 }"#).unwrap();
        let config = PulserConfig::from_file(&path).unwrap();
        assert_eq!(config.viewport_width, constants::VIEWPORT_WIDTH);
        assert_eq!(config.line_size, constants::LINE_SIZE);
        assert_eq!(PipelineConfig::from(&config).capacity, 125);

        // The smallest usable window is left alone
        fs::write(&path, r#"{ "viewport_width": 9.0, "line_size": 3.0 }"#).unwrap();
        let config = PulserConfig::from_file(&path).unwrap();
        assert_eq!(signal_capacity(config.viewport_width, config.line_size), constants::MIN_DETECTION_SAMPLES);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let path = temp_path("does_not_exist.json");
        let _ = fs::remove_file(&path);
        assert!(PulserConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let path = temp_path("malformed.json");
        fs::write(&path, "{ not json").unwrap();
        let err = PulserConfig::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }
}
