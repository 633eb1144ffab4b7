//! Error types for the assembly environment.
//!
//! Every error here is a configuration or invariant violation surfaced
//! immediately. Nothing in this crate is retried: stepping is deterministic
//! and synchronous, so there are no transient faults to recover from.

use thiserror::Error;

use crate::asset::AssetId;

/// Errors raised while validating an [`EnvConfig`](crate::config::EnvConfig).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Move speed outside the supported range.
    #[error("Invalid move speed: {0} (must be within 0.1..=10)")]
    InvalidMoveSpeed(f32),

    /// Rotation speed outside the supported range.
    #[error("Invalid rotation speed: {0} (must be within 1..=100)")]
    InvalidRotationSpeed(f32),

    /// Joint range outside the supported range.
    #[error("Invalid joint range: {0} (must be within 0.01..=0.5)")]
    InvalidJointRange(f32),

    /// Neighbor count of zero.
    #[error("Neighbor count must be at least 1")]
    ZeroNeighbors,

    /// History capacity of zero.
    #[error("History capacity must be at least 1")]
    ZeroHistory,

    /// A height band whose start is not below its end.
    #[error("Invalid height band '{name}': {start}..{end}")]
    InvalidHeightBand {
        /// Which band is malformed.
        name: &'static str,
        /// Band start (inclusive).
        start: f32,
        /// Band end (exclusive).
        end: f32,
    },
}

/// Errors that can occur while building or stepping an environment.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The scene supplied fewer than two assets.
    #[error("Scene has {0} asset(s); at least 2 are required")]
    TooFewAssets(usize),

    /// An asset without any joint points.
    #[error("Asset '{0}' has no joint points")]
    NoJointPoints(String),

    /// Assets disagree on how many joint points they carry.
    #[error("Asset '{name}' has {found} joint points, expected {expected}")]
    InconsistentJointCount {
        /// Offending asset name.
        name: String,
        /// Point count shared by the first asset.
        expected: usize,
        /// Point count found on the offending asset.
        found: usize,
    },

    /// Nearest-point search called with an empty source or candidate list.
    #[error("Nearest-point search called with an empty point set")]
    EmptyCandidateSet,

    /// Asset identifier not present in the asset set.
    #[error("Unknown asset: {0}")]
    UnknownAsset(AssetId),

    /// The episode already ended and was reported; call `reset` first.
    #[error("Episode has finished; reset before stepping again")]
    EpisodeFinished,

    /// Action vector of the wrong length.
    #[error("Action must have 6 components, got {0}")]
    InvalidAction(usize),

    /// A batch call got a different number of inputs than environments.
    #[error("Batch of {found} input(s) for {expected} environment(s)")]
    BatchSizeMismatch {
        /// Environments in the pool.
        expected: usize,
        /// Inputs supplied.
        found: usize,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed scene or config JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO failure while reading a scene/config or writing an export.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for assembly operations.
pub type AssemblyResult<T> = std::result::Result<T, AssemblyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AssemblyError::TooFewAssets(1);
        assert_eq!(format!("{err}"), "Scene has 1 asset(s); at least 2 are required");

        let err = AssemblyError::UnknownAsset(AssetId::new(7));
        assert!(format!("{err}").contains('7'));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: AssemblyError = ConfigError::InvalidJointRange(0.9).into();
        assert!(format!("{err}").contains("0.9"));
        assert!(matches!(err, AssemblyError::Config(ConfigError::InvalidJointRange(_))));
    }
}
