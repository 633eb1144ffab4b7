//! Observation encoding for the RL consumer.
//!
//! An observation is a flat `f32` vector of fixed length. Its structure is:
//!
//! ```text
//! [position(3) rotation(3) index(1)]
//! ++ [own points(P*3)]
//! ++ [neighbor points(k*P*3)] ++ [neighbor indices(k)]
//! ++ [history points(H*P*3)] ++ [history distances(H*P*P)]
//! ```
//!
//! where `P` is the number of joint points per asset, `k` the neighbor count
//! and `H` the history capacity. With fewer than `k` neighbors the missing
//! point slots are zero and the missing index slots are `-1`.
//!
//! # History
//!
//! The [`HistoryWindow`] holds two fixed buffers that are overwritten in
//! place. Each build recomputes them from the assets processed just before the
//! current one (up to `H` of them, most recent first). Only the prefix covered
//! by those assets is written; later slots keep whatever they held, which is
//! the sentinel after a clear (0 for positions, `-1` for distances).

use std::ops::Range;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, AssetSet};
use crate::spatial::{distance, SpatialIndex};

/// Sentinel for unused history point components.
pub const POSITION_SENTINEL: f32 = 0.0;
/// Sentinel for unused history distances and missing neighbor indices.
pub const DISTANCE_SENTINEL: f32 = -1.0;

const POSE_LEN: usize = 7;

// =============================================================================
// Layout
// =============================================================================

/// Sizes and offsets of the observation sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservationLayout {
    points_per_asset: usize,
    neighbor_count: usize,
    max_history: usize,
}

impl ObservationLayout {
    /// Creates a layout.
    #[must_use]
    pub const fn new(points_per_asset: usize, neighbor_count: usize, max_history: usize) -> Self {
        Self {
            points_per_asset,
            neighbor_count,
            max_history,
        }
    }

    /// Joint points per asset.
    #[must_use]
    pub const fn points_per_asset(&self) -> usize {
        self.points_per_asset
    }

    /// Neighbor slots.
    #[must_use]
    pub const fn neighbor_count(&self) -> usize {
        self.neighbor_count
    }

    /// History slots.
    #[must_use]
    pub const fn max_history(&self) -> usize {
        self.max_history
    }

    /// Position, rotation and index.
    #[must_use]
    pub const fn pose(&self) -> Range<usize> {
        0..POSE_LEN
    }

    /// Own joint point positions.
    #[must_use]
    pub const fn own_points(&self) -> Range<usize> {
        let start = POSE_LEN;
        start..start + self.points_per_asset * 3
    }

    /// Neighbor joint point positions.
    #[must_use]
    pub const fn neighbor_points(&self) -> Range<usize> {
        let start = self.own_points().end;
        start..start + self.neighbor_count * self.points_per_asset * 3
    }

    /// Neighbor indices.
    #[must_use]
    pub const fn neighbor_indices(&self) -> Range<usize> {
        let start = self.neighbor_points().end;
        start..start + self.neighbor_count
    }

    /// History joint point positions.
    #[must_use]
    pub const fn history_points(&self) -> Range<usize> {
        let start = self.neighbor_indices().end;
        start..start + self.max_history * self.points_per_asset * 3
    }

    /// History distances.
    #[must_use]
    pub const fn history_distances(&self) -> Range<usize> {
        let start = self.history_points().end;
        start..start + self.max_history * self.points_per_asset * self.points_per_asset
    }

    /// Total vector length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.history_distances().end
    }

    /// Always false: the pose section is never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

// =============================================================================
// History
// =============================================================================

/// Fixed-capacity rolling record of recently processed assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryWindow {
    capacity: usize,
    points_per_asset: usize,
    /// `capacity * P` point positions.
    positions: Vec<Vec3>,
    /// `P * capacity * P` distances, current point major.
    distances: Vec<f32>,
}

impl HistoryWindow {
    /// Creates a window filled with sentinels.
    #[must_use]
    pub fn new(capacity: usize, points_per_asset: usize) -> Self {
        Self {
            capacity,
            points_per_asset,
            positions: vec![Vec3::splat(POSITION_SENTINEL); capacity * points_per_asset],
            distances: vec![DISTANCE_SENTINEL; capacity * points_per_asset * points_per_asset],
        }
    }

    /// Maximum number of assets remembered.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Joint points recorded per remembered asset.
    #[must_use]
    pub const fn points_per_asset(&self) -> usize {
        self.points_per_asset
    }

    /// History point positions, most recent asset first.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Distances from each current point to each history point.
    #[must_use]
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Resets both buffers to their sentinels.
    pub fn clear(&mut self) {
        self.positions.fill(Vec3::splat(POSITION_SENTINEL));
        self.distances.fill(DISTANCE_SENTINEL);
    }

    /// Assets feeding the window for `current`: `idx-1` down to
    /// `idx-capacity`, stopping before asset 0. The first asset never enters
    /// the window.
    #[must_use]
    pub fn sources(&self, current: AssetId) -> Vec<AssetId> {
        let idx = current.as_u32();
        (1..idx)
            .take(self.capacity)
            .map(|back| AssetId::new(idx - back))
            .collect()
    }

    /// Recomputes the window for `current` from the spatial snapshot.
    ///
    /// Slots beyond the source count keep their values.
    pub fn update(&mut self, current: AssetId, index: &SpatialIndex) {
        let history_points: Vec<Vec3> = self
            .sources(current)
            .into_iter()
            .flat_map(|source| index.points_of(source).iter().copied())
            .collect();

        for (slot, position) in self.positions.iter_mut().zip(&history_points) {
            *slot = *position;
        }

        let distances = index
            .points_of(current)
            .iter()
            .flat_map(|own| history_points.iter().map(move |other| distance(*own, *other)));
        for (slot, value) in self.distances.iter_mut().zip(distances) {
            *slot = value;
        }
    }
}

// =============================================================================
// Observation
// =============================================================================

/// A built observation vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    values: Vec<f32>,
}

impl Observation {
    /// Returns the feature values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the values of one section, e.g. [`ObservationLayout::pose`].
    #[must_use]
    pub fn section(&self, range: Range<usize>) -> &[f32] {
        self.values.get(range).unwrap_or(&[])
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the observation, returning the raw vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

/// Builds observation vectors for the current asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationBuilder {
    layout: ObservationLayout,
}

impl ObservationBuilder {
    /// Creates a builder for the given layout.
    #[must_use]
    pub const fn new(layout: ObservationLayout) -> Self {
        Self { layout }
    }

    /// Returns the layout produced by this builder.
    #[must_use]
    pub const fn layout(&self) -> ObservationLayout {
        self.layout
    }

    /// Builds the observation for `current`, refreshing `history` first.
    ///
    /// An unknown `current` yields a zeroed pose section; the controller only
    /// passes identifiers from its own asset set.
    // Asset indices stay far below 2^24, so they are exact as f32.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(
        &self,
        current: AssetId,
        assets: &AssetSet,
        index: &SpatialIndex,
        history: &mut HistoryWindow,
    ) -> Observation {
        let mut values = Vec::with_capacity(self.layout.len());

        let (position, rotation) = assets
            .get(current)
            .map_or((Vec3::ZERO, Vec3::ZERO), |asset| (asset.position(), asset.rotation()));
        values.extend(position.to_array());
        values.extend(rotation.to_array());
        values.push(current.as_u32() as f32);

        extend_points(&mut values, index.points_of(current), self.layout.points_per_asset());

        let neighbors = index.nearest_neighbors(current, self.layout.neighbor_count());
        for slot in 0..self.layout.neighbor_count() {
            let points = neighbors
                .get(slot)
                .map(|n| index.points_of(*n))
                .unwrap_or_default();
            extend_points(&mut values, points, self.layout.points_per_asset());
        }
        for slot in 0..self.layout.neighbor_count() {
            values.push(
                neighbors
                    .get(slot)
                    .map_or(DISTANCE_SENTINEL, |n| n.as_u32() as f32),
            );
        }

        history.update(current, index);
        for position in history.positions() {
            values.extend(position.to_array());
        }
        values.extend_from_slice(history.distances());

        Observation { values }
    }
}

/// Appends exactly `count` points, zero-padding when `points` is short.
fn extend_points(values: &mut Vec<f32>, points: &[Vec3], count: usize) {
    for slot in 0..count {
        let point = points.get(slot).copied().unwrap_or(Vec3::ZERO);
        values.extend(point.to_array());
    }
}

// =============================================================================
// Tests
// =============================================================================
