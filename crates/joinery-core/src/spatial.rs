//! Spatial queries over assets and their joint points.
//!
//! The [`SpatialIndex`] is a per-step snapshot of every asset position and
//! every joint point's world position, taken from an [`AssetSet`]. Queries
//! read the snapshot only, so one bind attempt sees a single consistent pose
//! of the scene.
//!
//! # Determinism
//!
//! All queries break ties by processing order: nearest-neighbor queries use a
//! stable sort over asset index, and the nearest-point search keeps the first
//! pair encountered in (source, candidate) iteration order.
//!
//! # Example
//!
//! ```
//! use joinery_core::asset::{Asset, AssetId, AssetSet, JointPoint};
//! use joinery_core::spatial::SpatialIndex;
//! use glam::Vec3;
//!
//! let point = || vec![JointPoint::new("p", Vec3::ZERO)];
//! let assets = AssetSet::new(vec![
//!     Asset::new("a", Vec3::ZERO, point()),
//!     Asset::new("b", Vec3::new(5.0, 0.0, 0.0), point()),
//!     Asset::new("c", Vec3::new(1.0, 0.0, 0.0), point()),
//! ])
//! .unwrap();
//!
//! let index = SpatialIndex::from_assets(&assets);
//! let nearest = index.nearest_neighbors(AssetId::new(0), 2);
//! assert_eq!(nearest, vec![AssetId::new(2), AssetId::new(1)]);
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, AssetSet, JointPointRef};
use crate::error::{AssemblyError, AssemblyResult};

/// Euclidean distance between two points.
#[must_use]
pub fn distance(p1: Vec3, p2: Vec3) -> f32 {
    (p1 - p2).length()
}

/// Result of a nearest-point search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointMatch {
    /// Distance between the winning pair.
    pub distance: f32,
    /// The source point of the winning pair.
    pub source: JointPointRef,
    /// The candidate point of the winning pair.
    pub candidate: JointPointRef,
}

impl PointMatch {
    /// Returns the asset owning the winning candidate point.
    #[must_use]
    pub const fn owner(&self) -> AssetId {
        self.candidate.owner()
    }
}

/// Snapshot of asset and joint point positions for proximity queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialIndex {
    /// Asset positions, indexed by asset index.
    asset_positions: Vec<Vec3>,
    /// Joint point world positions, indexed by asset index then slot.
    point_positions: Vec<Vec<Vec3>>,
}

impl SpatialIndex {
    /// Snapshots the current pose of every asset.
    #[must_use]
    pub fn from_assets(assets: &AssetSet) -> Self {
        Self {
            asset_positions: assets.positions(),
            point_positions: assets.iter().map(|a| a.joint_world_positions()).collect(),
        }
    }

    /// Returns the number of assets in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.asset_positions.len()
    }

    /// Returns true if the snapshot holds no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.asset_positions.is_empty()
    }

    /// Returns an asset's position, if known.
    #[must_use]
    pub fn asset_position(&self, id: AssetId) -> Option<Vec3> {
        self.asset_positions.get(id.index()).copied()
    }

    /// Returns a joint point's world position, if known.
    #[must_use]
    pub fn point_position(&self, point: JointPointRef) -> Option<Vec3> {
        self.point_positions
            .get(point.owner().index())
            .and_then(|slots| slots.get(point.slot()))
            .copied()
    }

    /// Returns the world positions of an asset's joint points in slot order.
    #[must_use]
    pub fn points_of(&self, id: AssetId) -> &[Vec3] {
        self.point_positions
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the `k` assets closest to `id`, nearest first.
    ///
    /// The queried asset is never part of the result. Ties keep processing
    /// order. Fewer than `k` results are returned when the set is smaller.
    #[must_use]
    pub fn nearest_neighbors(&self, id: AssetId, k: usize) -> Vec<AssetId> {
        let Some(origin) = self.asset_position(id) else {
            return Vec::new();
        };

        // Scenes beyond u32::MAX assets are rejected by AssetSet.
        #[allow(clippy::cast_possible_truncation)]
        let mut by_distance: Vec<(AssetId, f32)> = self
            .asset_positions
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != id.index())
            .map(|(index, pos)| (AssetId::new(index as u32), distance(origin, *pos)))
            .collect();

        // Stable sort keeps processing order among equal distances.
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));
        by_distance.into_iter().take(k).map(|(id, _)| id).collect()
    }

    /// Finds the closest pair over `sources × candidates`.
    ///
    /// Sources are the outer loop and candidates the inner loop; on equal
    /// distances the first pair encountered wins.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::EmptyCandidateSet`] if either list is empty,
    /// and [`AssemblyError::UnknownAsset`] if a point is not in the snapshot.
    pub fn min_distance_point(
        &self,
        sources: &[JointPointRef],
        candidates: &[JointPointRef],
    ) -> AssemblyResult<PointMatch> {
        if sources.is_empty() || candidates.is_empty() {
            return Err(AssemblyError::EmptyCandidateSet);
        }

        let candidate_positions = candidates
            .iter()
            .map(|c| self.require_point(*c))
            .collect::<AssemblyResult<Vec<_>>>()?;

        let mut best: Option<PointMatch> = None;
        for source in sources {
            let from = self.require_point(*source)?;
            for (candidate, to) in candidates.iter().zip(&candidate_positions) {
                let d = distance(from, *to);
                if best.map_or(true, |b| d < b.distance) {
                    best = Some(PointMatch {
                        distance: d,
                        source: *source,
                        candidate: *candidate,
                    });
                }
            }
        }

        best.ok_or(AssemblyError::EmptyCandidateSet)
    }

    fn require_point(&self, point: JointPointRef) -> AssemblyResult<Vec3> {
        self.point_position(point)
            .ok_or(AssemblyError::UnknownAsset(point.owner()))
    }
}

// =============================================================================
// Tests
// =============================================================================
