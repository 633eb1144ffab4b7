//! # Joinery Core
//!
//! Incremental assembly environment for reinforcement learning.
//!
//! An agent moves one asset at a time. When one of the asset's joint points
//! comes within range of a point on the growing structure, the asset binds to
//! it and the next asset becomes active. Rewards follow assembly progress and
//! the height distribution of the finished structure.
//!
//! ## Architecture
//!
//! Components, leaves first:
//!
//! - **[`SpatialIndex`]**: distances, nearest neighbors and nearest point pairs
//! - **[`JointGraph`]**: bound group membership, point filtering and resets
//! - **[`BindingResolver`]**: first-asset and subsequent-asset bind rules
//! - **[`ObservationBuilder`]**: fixed-size feature vectors with a history window
//! - **[`EpisodeController`]**: index progression, reward shaping and resets
//!
//! Around them sit the scene providers ([`scene`]), configuration
//! ([`config`]), host notifications ([`feedback`]) and a parallel batch of
//! environments ([`EnvPool`]).
//!
//! ## Determinism
//!
//! Stepping is synchronous and free of hidden randomness. Ties are broken by
//! processing order, and seeded scenes use `ChaCha8Rng`. Identical scenes and
//! action sequences give identical [`EpisodeController::state_hash`] values.
//!
//! ## Usage
//!
//! ```
//! use joinery_core::{Action, EnvConfig, EpisodeController, ScatterLayout};
//!
//! let scene = ScatterLayout::new(8, 42);
//! let mut env = EpisodeController::new(&scene, EnvConfig::default()).unwrap();
//!
//! let observation = env.reset().unwrap();
//! assert_eq!(observation.len(), env.observation_size());
//!
//! let outcome = env.step(&Action::default(), 0.02).unwrap();
//! assert!(!outcome.done);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod asset;
pub mod binding;
pub mod config;
pub mod episode;
pub mod error;
pub mod feedback;
pub mod graph;
pub mod hash;
pub mod observation;
pub mod pool;
pub mod scene;
pub mod spatial;

// Re-exports for convenience
pub use asset::{Asset, AssetId, AssetSet, JointPoint, JointPointRef};
pub use binding::{AssetRole, BindOutcome, BindingResolver};
pub use config::{EnvConfig, ExportConfig, FractionTarget, HeightBands, RewardConfig};
pub use episode::{
    Action, ContactListener, EpisodeController, EpisodeFlags, EpisodePhase, EpisodeState,
    StepOutcome, ACTION_SIZE,
};
pub use error::{AssemblyError, AssemblyResult, ConfigError};
pub use feedback::{
    AssemblySnapshot, AssetMark, Feedback, GroundMark, JsonExporter, NullFeedback,
    RecordingFeedback,
};
pub use graph::JointGraph;
pub use hash::hash_episode;
pub use observation::{HistoryWindow, Observation, ObservationBuilder, ObservationLayout};
pub use pool::EnvPool;
pub use scene::{ScatterLayout, SceneDescription, SceneProvider};
pub use spatial::SpatialIndex;

#[cfg(test)]
mod tests;
