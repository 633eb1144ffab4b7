//! Test helper functions for building scenes and environments.

use glam::Vec3;

use crate::asset::{Asset, AssetSet, JointPoint};
use crate::config::EnvConfig;
use crate::episode::{Action, EpisodeController};
use crate::feedback::RecordingFeedback;

/// Time step used by the scenario tests.
pub const DT: f32 = 0.02;

// =============================================================================
// Scenes
// =============================================================================

/// Builds a chain whose neighbors share a joint point exactly.
///
/// Every asset has two points: `prev` halfway toward the previous asset and
/// `next` halfway toward the following one. The ends point half a unit
/// outward along X. With dyadic coordinates all midpoints are exact, so
/// adjacent assets are at distance 0 and bind without moving.
pub fn chain_through(positions: &[Vec3]) -> AssetSet {
    let last = positions.len() - 1;
    let assets = positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let prev = if i == 0 {
                Vec3::new(-0.5, 0.0, 0.0)
            } else {
                (positions[i - 1] - *position) * 0.5
            };
            let next = if i == last {
                Vec3::new(0.5, 0.0, 0.0)
            } else {
                (positions[i + 1] - *position) * 0.5
            };
            Asset::new(
                format!("asset_{i:02}"),
                *position,
                vec![JointPoint::new("prev", prev), JointPoint::new("next", next)],
            )
        })
        .collect();
    AssetSet::new(assets).unwrap()
}

/// A straight chain of `count` assets along X, one unit apart, at height 0.
pub fn chain(count: u32) -> AssetSet {
    #[allow(clippy::cast_precision_loss)]
    let positions: Vec<Vec3> = (0..count)
        .map(|i| Vec3::new(i as f32, 0.0, 0.0))
        .collect();
    chain_through(&positions)
}

/// Assets with a single joint point at their origin.
pub fn single_points(positions: &[Vec3]) -> AssetSet {
    let assets = positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            Asset::new(
                format!("asset_{i:02}"),
                *position,
                vec![JointPoint::new("p", Vec3::ZERO)],
            )
        })
        .collect();
    AssetSet::new(assets).unwrap()
}

// =============================================================================
// Environments
// =============================================================================

/// Builds an environment with default config that records feedback, and
/// resets it.
pub fn recorded_env(assets: &AssetSet) -> EpisodeController<RecordingFeedback> {
    recorded_env_with(assets, EnvConfig::default())
}

/// As [`recorded_env`] with an explicit config.
pub fn recorded_env_with(
    assets: &AssetSet,
    config: EnvConfig,
) -> EpisodeController<RecordingFeedback> {
    let mut env = EpisodeController::with_feedback(assets, config, RecordingFeedback::new()).unwrap();
    env.reset().unwrap();
    env
}

/// Zero action: keeps the active asset in place.
pub fn idle() -> Action {
    Action::default()
}

/// Moves the active asset by `delta` within one [`DT`] step at the default
/// move speed.
pub fn nudge(delta: Vec3) -> Action {
    let scale = EnvConfig::default().move_speed * DT;
    Action::new(delta / scale, Vec3::ZERO)
}
