//! State hashing for determinism verification.
//!
//! Two environments built from the same scene and fed the same actions must
//! produce identical hashes after every step. Floats are hashed by bit
//! pattern so no float comparison is involved.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::Vec3;

use crate::asset::AssetSet;
use crate::episode::EpisodeState;
use crate::graph::JointGraph;
use crate::observation::HistoryWindow;

/// Compute a deterministic hash of an episode.
///
/// This hash includes:
/// - Active asset, phase, flags, step count and cumulative reward
/// - Every asset pose in processing order
/// - Bound group members in bind order
/// - Both history buffers
#[must_use]
pub fn hash_episode(
    assets: &AssetSet,
    graph: &JointGraph,
    state: &EpisodeState,
    history: &HistoryWindow,
) -> u64 {
    let mut hasher = DefaultHasher::new();

    state.current().hash(&mut hasher);
    state.phase().hash(&mut hasher);
    state.flags().bits().hash(&mut hasher);
    state.steps().hash(&mut hasher);
    state.cumulative_reward().to_bits().hash(&mut hasher);

    for asset in assets.iter() {
        asset.id().hash(&mut hasher);
        hash_vec3(asset.position(), &mut hasher);
        hash_vec3(asset.rotation(), &mut hasher);
    }

    graph.members().hash(&mut hasher);

    for position in history.positions() {
        hash_vec3(*position, &mut hasher);
    }
    for distance in history.distances() {
        distance.to_bits().hash(&mut hasher);
    }

    hasher.finish()
}

/// Hash a vector by converting each component to bits.
fn hash_vec3<H: Hasher>(value: Vec3, hasher: &mut H) {
    value.x.to_bits().hash(hasher);
    value.y.to_bits().hash(hasher);
    value.z.to_bits().hash(hasher);
}
