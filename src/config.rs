//! Preferences consumed by the shot pipeline
//!
//! Preferences are read from a TOML file. Every key is optional and falls back
//! to its default, so an empty file is a valid configuration:
//!
//! ```toml
//! laser_intensity = 230
//! detection_rate = 100
//! ignore_laser_color = "none"
//! marker_radius = 10
//! debug = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::vision::LaserColor;
use crate::{Result, ShootOffError};

/// Laser color the detector should drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreColor {
    /// Accept both colors
    #[default]
    None,
    Red,
    Green,
}

impl IgnoreColor {
    /// Check whether a classified shot color should be dropped
    pub fn ignores(&self, color: LaserColor) -> bool {
        matches!(
            (self, color),
            (IgnoreColor::Red, LaserColor::Red) | (IgnoreColor::Green, LaserColor::Green)
        )
    }
}

impl std::str::FromStr for IgnoreColor {
    type Err = ShootOffError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(IgnoreColor::None),
            "red" => Ok(IgnoreColor::Red),
            "green" => Ok(IgnoreColor::Green),
            other => Err(ShootOffError::InvalidPreference {
                key: "ignore_laser_color",
                reason: format!("unknown color '{}'", other),
            }),
        }
    }
}

/// Detection preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Brightness cutoff (0-255) for the binary laser mask
    #[serde(default = "default_laser_intensity")]
    pub laser_intensity: u8,
    /// Interval between detection ticks in milliseconds
    #[serde(default = "default_detection_rate")]
    pub detection_rate: u64,
    /// Laser color to ignore
    #[serde(default)]
    pub ignore_laser_color: IgnoreColor,
    /// Radius of the color sampling circle and of the drawn shot marker
    #[serde(default = "default_marker_radius")]
    pub marker_radius: u32,
    /// Allow synthetic shots injected by clicking the feed
    #[serde(default)]
    pub debug: bool,
}

fn default_laser_intensity() -> u8 {
    230
}

fn default_detection_rate() -> u64 {
    100
}

fn default_marker_radius() -> u32 {
    10
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            laser_intensity: default_laser_intensity(),
            detection_rate: default_detection_rate(),
            ignore_laser_color: IgnoreColor::None,
            marker_radius: default_marker_radius(),
            debug: false,
        }
    }
}

impl Preferences {
    /// Parse preferences from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let prefs: Preferences = toml::from_str(text)?;
        prefs.validate()?;
        Ok(prefs)
    }

    /// Load preferences from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let prefs = Self::from_toml_str(&text)?;
        log::debug!("Loaded preferences from {}", path.display());
        Ok(prefs)
    }

    /// Write preferences to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.detection_rate == 0 {
            return Err(ShootOffError::InvalidPreference {
                key: "detection_rate",
                reason: "must be at least 1 ms".to_string(),
            });
        }
        if self.marker_radius == 0 {
            return Err(ShootOffError::InvalidPreference {
                key: "marker_radius",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Detection tick interval
    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_rate)
    }

    /// Builder-style setter used mostly by tests and embedders
    pub fn with_ignore_color(mut self, color: IgnoreColor) -> Self {
        self.ignore_laser_color = color;
        self
    }

    /// Enable synthetic click-as-shot injection
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Feed runner settings that are not user preferences
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Interval between frame refresh ticks
    pub feed_interval: Duration,
    /// Consecutive capture failures tolerated before shutting down
    pub max_missed_frames: u32,
    /// Resolution requested when the camera reports something smaller
    pub min_resolution: (u32, u32),
    /// How long the interference view stays up once accepted
    pub interference_view: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            feed_interval: Duration::from_millis(33),
            max_missed_frames: 25,
            min_resolution: (640, 480),
            interference_view: Duration::from_secs(5),
        }
    }
}

impl RunnerConfig {
    /// Derive the refresh interval from a camera frame rate.
    /// Non-positive rates keep the current interval.
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        if fps > 0.0 {
            self.feed_interval = Duration::from_secs_f64(1.0 / fps);
        }
        self
    }

    /// Number of refresh ticks the interference view should last
    pub fn interference_ticks(&self) -> u32 {
        let tick_ms = self.feed_interval.as_millis().max(1);
        let view_ms = self.interference_view.as_millis();
        ((view_ms + tick_ms - 1) / tick_ms) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let prefs = Preferences::from_toml_str("").unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.marker_radius, 10);
        assert_eq!(prefs.ignore_laser_color, IgnoreColor::None);
    }

    #[test]
    fn test_parse_all_keys() {
        let prefs = Preferences::from_toml_str(
            r#"
            laser_intensity = 200
            detection_rate = 50
            ignore_laser_color = "green"
            marker_radius = 4
            debug = true
            "#,
        )
        .unwrap();

        assert_eq!(prefs.laser_intensity, 200);
        assert_eq!(prefs.detection_interval(), Duration::from_millis(50));
        assert_eq!(prefs.ignore_laser_color, IgnoreColor::Green);
        assert_eq!(prefs.marker_radius, 4);
        assert!(prefs.debug);
    }

    #[test]
    fn test_zero_detection_rate_rejected() {
        let err = Preferences::from_toml_str("detection_rate = 0").unwrap_err();
        assert!(matches!(
            err,
            ShootOffError::InvalidPreference { key: "detection_rate", .. }
        ));
    }

    #[test]
    fn test_unknown_color_rejected() {
        assert!(Preferences::from_toml_str("ignore_laser_color = \"blue\"").is_err());
        assert!("blue".parse::<IgnoreColor>().is_err());
        assert_eq!("RED".parse::<IgnoreColor>().unwrap(), IgnoreColor::Red);
    }

    #[test]
    fn test_ignore_matches_only_its_color() {
        assert!(IgnoreColor::Red.ignores(LaserColor::Red));
        assert!(!IgnoreColor::Red.ignores(LaserColor::Green));
        assert!(!IgnoreColor::None.ignores(LaserColor::Green));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shootoff.toml");

        let prefs = Preferences::default()
            .with_ignore_color(IgnoreColor::Red)
            .with_debug(true);
        prefs.save(&path).unwrap();

        assert_eq!(Preferences::load(&path).unwrap(), prefs);
    }

    #[test]
    fn test_interference_ticks() {
        let config = RunnerConfig::default();
        // 5000 ms at 33 ms per tick
        assert_eq!(config.interference_ticks(), 152);

        let config = RunnerConfig::default().with_frame_rate(10.0);
        assert_eq!(config.feed_interval, Duration::from_millis(100));
        assert_eq!(config.interference_ticks(), 50);

        let config = RunnerConfig::default().with_frame_rate(0.0);
        assert_eq!(config.feed_interval, Duration::from_millis(33));
    }
}
