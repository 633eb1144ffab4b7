//! Environment configuration.
//!
//! Every tunable of an environment lives in [`EnvConfig`]. Fields not present
//! in a JSON document fall back to their defaults, so a config file only needs
//! to name what it changes.
//!
//! # Example
//!
//! ```
//! use joinery_core::config::EnvConfig;
//!
//! let config = EnvConfig::from_json_str(r#"{ "joint_range": 0.2 }"#).unwrap();
//! assert!((config.joint_range - 0.2).abs() < f32::EPSILON);
//! assert_eq!(config.neighbor_count, 3);
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssemblyResult, ConfigError};

/// Reward constants applied by the episode controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Added once when the structure is complete.
    pub completion_bonus: f32,
    /// Added per height band whose fraction lands inside its target.
    pub band_bonus: f32,
    /// Added per height band whose fraction misses its target.
    pub band_penalty: f32,
    /// Added when the failure trigger fires.
    pub failure_penalty: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            completion_bonus: 20.0,
            band_bonus: 10.0,
            band_penalty: -10.0,
            failure_penalty: -20.0,
        }
    }
}

/// An open interval `(low, high)` of acceptable band fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractionTarget {
    /// Exclusive lower bound.
    pub low: f32,
    /// Exclusive upper bound.
    pub high: f32,
}

impl FractionTarget {
    /// Creates a target interval.
    #[must_use]
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Returns true if `fraction` lies strictly between the bounds.
    #[must_use]
    pub fn contains(&self, fraction: f32) -> bool {
        fraction > self.low && fraction < self.high
    }
}

/// Height bands used to score a finished structure.
///
/// Each band is a half-open Y range `[start, end)`. At completion the fraction
/// of assets whose Y falls inside a band is compared to that band's target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightBands {
    /// Lower band.
    pub low: Range<f32>,
    /// Target fraction for the lower band.
    pub low_target: FractionTarget,
    /// Upper band.
    pub high: Range<f32>,
    /// Target fraction for the upper band.
    pub high_target: FractionTarget,
}

impl Default for HeightBands {
    fn default() -> Self {
        Self {
            low: -1.0..1.3,
            low_target: FractionTarget::new(0.10, 0.15),
            high: 1.3..2.0,
            high_target: FractionTarget::new(0.30, 0.85),
        }
    }
}

/// Settings for exporting a completed structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Whether a successful episode writes a snapshot.
    pub enabled: bool,
    /// Base file name of the snapshot, without extension.
    pub prefab_name: String,
    /// Directory snapshots are written to.
    pub export_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefab_name: "structure".to_string(),
            export_path: PathBuf::from("output"),
        }
    }
}

/// Configuration for one assembly environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Translation per unit action per second.
    pub move_speed: f32,
    /// Rotation in degrees per unit action per second.
    pub rot_speed: f32,
    /// Maximum joint point distance at which a bind succeeds (inclusive).
    pub joint_range: f32,
    /// Number of nearest neighbors observed and searched.
    pub neighbor_count: usize,
    /// Capacity of the history window.
    pub max_history: usize,
    /// Reward constants.
    pub rewards: RewardConfig,
    /// Completion scoring bands.
    pub height_bands: HeightBands,
    /// Snapshot export on success.
    pub export: ExportConfig,
    /// Steps before an episode is truncated; 0 disables truncation.
    pub max_steps: u32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            rot_speed: 50.0,
            joint_range: 0.3,
            neighbor_count: 3,
            max_history: 5,
            rewards: RewardConfig::default(),
            height_bands: HeightBands::default(),
            export: ExportConfig::default(),
            max_steps: 0,
        }
    }
}

impl EnvConfig {
    /// Parses a config from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns a JSON error for malformed input or a config error if any value
    /// is out of range.
    pub fn from_json_str(json: &str) -> AssemblyResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, otherwise as
    /// [`EnvConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> AssemblyResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Sets the joint range.
    #[must_use]
    pub fn with_joint_range(mut self, joint_range: f32) -> Self {
        self.joint_range = joint_range;
        self
    }

    /// Sets the step limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Checks every value against its supported range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.1..=10.0).contains(&self.move_speed) {
            return Err(ConfigError::InvalidMoveSpeed(self.move_speed));
        }
        if !(1.0..=100.0).contains(&self.rot_speed) {
            return Err(ConfigError::InvalidRotationSpeed(self.rot_speed));
        }
        if !(0.01..=0.5).contains(&self.joint_range) {
            return Err(ConfigError::InvalidJointRange(self.joint_range));
        }
        if self.neighbor_count == 0 {
            return Err(ConfigError::ZeroNeighbors);
        }
        if self.max_history == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        for (name, band) in [
            ("low", &self.height_bands.low),
            ("high", &self.height_bands.high),
        ] {
            if band.start >= band.end {
                return Err(ConfigError::InvalidHeightBand {
                    name,
                    start: band.start,
                    end: band.end,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssemblyError;

    #[test]
    fn defaults_are_valid() {
        let config = EnvConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.neighbor_count, 3);
        assert_eq!(config.max_history, 5);
        assert_eq!(config.max_steps, 0);
        assert!(!config.export.enabled);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EnvConfig::from_json_str(
            r#"{ "move_speed": 1.5, "rewards": { "completion_bonus": 50.0 } }"#,
        )
        .unwrap();

        assert!((config.move_speed - 1.5).abs() < f32::EPSILON);
        assert!((config.rewards.completion_bonus - 50.0).abs() < f32::EPSILON);
        assert!((config.rewards.failure_penalty + 20.0).abs() < f32::EPSILON);
        assert!((config.rot_speed - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let config = EnvConfig::default().with_joint_range(0.9);
        assert_eq!(config.validate(), Err(ConfigError::InvalidJointRange(0.9)));

        let config = EnvConfig {
            neighbor_count: 0,
            ..EnvConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroNeighbors));

        let config = EnvConfig {
            rot_speed: 0.0,
            ..EnvConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRotationSpeed(0.0)));
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut config = EnvConfig::default();
        config.height_bands.high = 2.0..1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHeightBand { name: "high", .. })
        ));
    }

    #[test]
    fn invalid_json_surfaces_as_config_error() {
        let result = EnvConfig::from_json_str(r#"{ "move_speed": 40.0 }"#);
        assert!(matches!(
            result,
            Err(AssemblyError::Config(ConfigError::InvalidMoveSpeed(_)))
        ));

        let result = EnvConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(AssemblyError::Json(_))));
    }

    #[test]
    fn fraction_target_is_open() {
        let target = FractionTarget::new(0.10, 0.15);
        assert!(target.contains(0.125));
        assert!(!target.contains(0.10));
        assert!(!target.contains(0.15));
    }

    #[test]
    fn serialization_roundtrip() {
        let config = EnvConfig::default().with_max_steps(200);
        let json = serde_json::to_string(&config).unwrap();
        let parsed = EnvConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
