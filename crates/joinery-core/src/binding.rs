//! Binding resolver: decides whether the moving asset joins the structure.
//!
//! The resolver distinguishes two roles:
//!
//! - **First asset** (index 0): the group does not exist yet. A bind seeds
//!   the group with the moving asset *and* the asset owning the closest
//!   candidate point, and reports that partner.
//! - **Subsequent asset** (index > 0): the closest candidate point must
//!   already belong to the group. Only the moving asset is bound and no
//!   partner is reported, since the target is the existing structure.
//!
//! Every later bind attaches to the existing group; a second disjoint group
//! can never form. Binding is suppressed while the collision flag is set,
//! whatever the distance. The range check is inclusive.
//!
//! # Candidate Points
//!
//! Candidates are the points of the `k` nearest neighbors (by asset
//! position), followed by the points of every bound member in bind order,
//! with the moving asset's own points removed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asset::{AssetId, AssetSet, JointPointRef};
use crate::config::EnvConfig;
use crate::error::AssemblyResult;
use crate::graph::JointGraph;
use crate::spatial::SpatialIndex;

/// Role of the moving asset in the bind rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetRole {
    /// Index 0: seeds the bound group together with its closest neighbor.
    First,
    /// Index > 0: must attach onto the existing bound group.
    Subsequent,
}

impl AssetRole {
    /// Returns the role of the asset with the given identifier.
    #[must_use]
    pub const fn of(asset: AssetId) -> Self {
        if asset.index() == 0 {
            Self::First
        } else {
            Self::Subsequent
        }
    }
}

/// Result of a bind attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BindOutcome {
    /// Whether the moving asset was bound.
    pub connected: bool,
    /// Partner of a seed bind; `None` for subsequent binds and failures.
    pub connected_with: Option<AssetId>,
    /// Closest point distance found during the attempt.
    pub distance: f32,
}

impl BindOutcome {
    const fn rejected(distance: f32) -> Self {
        Self {
            connected: false,
            connected_with: None,
            distance,
        }
    }
}

/// Applies the first/subsequent bind rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BindingResolver {
    joint_range: f32,
    neighbor_count: usize,
}

impl BindingResolver {
    /// Creates a resolver with the given inclusive joint range and neighbor count.
    #[must_use]
    pub const fn new(joint_range: f32, neighbor_count: usize) -> Self {
        Self {
            joint_range,
            neighbor_count,
        }
    }

    /// Creates a resolver from environment configuration.
    #[must_use]
    pub const fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.joint_range, config.neighbor_count)
    }

    /// Returns the inclusive bind distance.
    #[must_use]
    pub const fn joint_range(&self) -> f32 {
        self.joint_range
    }

    /// Collects candidate points for `current`: neighbor points, then bound
    /// member points, excluding the points `current` owns.
    #[must_use]
    pub fn candidates(
        &self,
        current: AssetId,
        assets: &AssetSet,
        graph: &JointGraph,
        index: &SpatialIndex,
    ) -> Vec<JointPointRef> {
        let mut point_lists: Vec<Vec<JointPointRef>> = index
            .nearest_neighbors(current, self.neighbor_count)
            .into_iter()
            .map(|neighbor| JointGraph::children_of(assets, neighbor, None))
            .collect();
        point_lists.extend(graph.member_points(assets));

        JointGraph::exclude_owned_by(&point_lists, current)
    }

    /// Attempts to bind `current` into the group.
    ///
    /// On failure nothing is modified.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::UnknownAsset`](crate::AssemblyError::UnknownAsset)
    ///   if `current` is not in `assets`
    /// - [`AssemblyError::EmptyCandidateSet`](crate::AssemblyError::EmptyCandidateSet)
    ///   if no candidate points exist, which a validated [`AssetSet`] rules out
    pub fn attempt_bind(
        &self,
        current: AssetId,
        assets: &AssetSet,
        graph: &mut JointGraph,
        is_collided: bool,
    ) -> AssemblyResult<BindOutcome> {
        assets.require(current)?;

        let index = SpatialIndex::from_assets(assets);
        let own_points = JointGraph::children_of(assets, current, None);
        let candidates = self.candidates(current, assets, graph, &index);
        let found = index.min_distance_point(&own_points, &candidates)?;

        let partner = found.owner();
        let in_range = found.distance <= self.joint_range && !is_collided;

        let outcome = match AssetRole::of(current) {
            AssetRole::First if in_range => {
                graph.bind(current);
                graph.bind(partner);
                BindOutcome {
                    connected: true,
                    connected_with: Some(partner),
                    distance: found.distance,
                }
            }
            AssetRole::Subsequent if in_range && graph.is_bound(partner) => {
                graph.bind(current);
                BindOutcome {
                    connected: true,
                    connected_with: None,
                    distance: found.distance,
                }
            }
            _ => BindOutcome::rejected(found.distance),
        };

        debug!(
            asset = current.as_u32(),
            nearest = partner.as_u32(),
            distance = found.distance,
            collided = is_collided,
            connected = outcome.connected,
            "Bind attempt"
        );
        Ok(outcome)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, JointPoint};
    use glam::Vec3;

    /// Assets with one joint point at their origin, placed along X.
    fn assets_at(xs: &[f32]) -> AssetSet {
        AssetSet::new(
            xs.iter()
                .enumerate()
                .map(|(i, x)| {
                    Asset::new(
                        format!("a{i}"),
                        Vec3::new(*x, 0.0, 0.0),
                        vec![JointPoint::new("p", Vec3::ZERO)],
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn resolver() -> BindingResolver {
        BindingResolver::new(0.25, 3)
    }

    mod first_asset_tests {
        use super::*;

        #[test]
        fn seed_bind_adds_both_assets() {
            let assets = assets_at(&[0.0, 0.2, 5.0]);
            let mut graph = JointGraph::new();

            let outcome = resolver()
                .attempt_bind(AssetId::new(0), &assets, &mut graph, false)
                .unwrap();

            assert!(outcome.connected);
            assert_eq!(outcome.connected_with, Some(AssetId::new(1)));
            assert_eq!(graph.members(), &[AssetId::new(0), AssetId::new(1)]);
        }

        #[test]
        fn distance_equal_to_range_connects() {
            let assets = assets_at(&[0.0, 0.25, 5.0]);
            let mut graph = JointGraph::new();

            let outcome = resolver()
                .attempt_bind(AssetId::new(0), &assets, &mut graph, false)
                .unwrap();
            assert!(outcome.connected);
        }

        #[test]
        fn collision_blocks_bind_at_boundary() {
            let assets = assets_at(&[0.0, 0.25, 5.0]);
            let mut graph = JointGraph::new();

            let outcome = resolver()
                .attempt_bind(AssetId::new(0), &assets, &mut graph, true)
                .unwrap();
            assert!(!outcome.connected);
            assert!(graph.is_empty());
        }

        #[test]
        fn out_of_range_has_no_side_effects() {
            let assets = assets_at(&[0.0, 1.0, 5.0]);
            let mut graph = JointGraph::new();

            let outcome = resolver()
                .attempt_bind(AssetId::new(0), &assets, &mut graph, false)
                .unwrap();
            assert_eq!(outcome.connected_with, None);
            assert!((outcome.distance - 1.0).abs() < 1e-6);
            assert!(graph.is_empty());
        }
    }

    mod subsequent_asset_tests {
        use super::*;

        #[test]
        fn binds_onto_existing_group_without_partner() {
            let assets = assets_at(&[0.0, 0.2, 0.4]);
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(0));
            graph.bind(AssetId::new(1));

            let outcome = resolver()
                .attempt_bind(AssetId::new(2), &assets, &mut graph, false)
                .unwrap();

            assert!(outcome.connected);
            assert_eq!(outcome.connected_with, None);
            assert_eq!(graph.len(), 3);
        }

        #[test]
        fn refuses_free_target() {
            // Asset 2 is closest to free asset 3, not to the group.
            let assets = assets_at(&[0.0, 0.2, 3.0, 3.1]);
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(0));
            graph.bind(AssetId::new(1));

            let outcome = resolver()
                .attempt_bind(AssetId::new(2), &assets, &mut graph, false)
                .unwrap();

            assert!(!outcome.connected);
            assert_eq!(graph.len(), 2);
        }

        #[test]
        fn bound_members_beyond_neighbors_are_candidates() {
            // With one neighbor considered, asset 3 is the only neighbor of
            // asset 2; asset 0's point still reaches asset 2 through the group.
            let point_at = |x: f32| vec![JointPoint::new("p", Vec3::new(x, 0.0, 0.0))];
            let assets = AssetSet::new(vec![
                Asset::new("a0", Vec3::ZERO, point_at(1.8)),
                Asset::new("a1", Vec3::new(9.0, 0.0, 0.0), point_at(0.0)),
                Asset::new("a2", Vec3::new(2.0, 0.0, 0.0), point_at(0.0)),
                Asset::new("a3", Vec3::new(2.5, 0.0, 0.0), point_at(0.0)),
            ])
            .unwrap();
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(0));
            graph.bind(AssetId::new(1));

            let narrow = BindingResolver::new(0.25, 1);
            let index = SpatialIndex::from_assets(&assets);
            assert_eq!(index.nearest_neighbors(AssetId::new(2), 1), vec![AssetId::new(3)]);

            let outcome = narrow
                .attempt_bind(AssetId::new(2), &assets, &mut graph, false)
                .unwrap();
            assert!(outcome.connected);
            assert!(graph.is_bound(AssetId::new(2)));
        }

        #[test]
        fn collision_blocks_subsequent_bind() {
            let assets = assets_at(&[0.0, 0.2, 0.4]);
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(0));
            graph.bind(AssetId::new(1));

            let outcome = resolver()
                .attempt_bind(AssetId::new(2), &assets, &mut graph, true)
                .unwrap();
            assert!(!outcome.connected);
            assert!(!graph.is_bound(AssetId::new(2)));
        }
    }

    #[test]
    fn candidates_exclude_own_points() {
        let assets = assets_at(&[0.0, 0.2, 0.4]);
        let mut graph = JointGraph::new();
        graph.bind(AssetId::new(0));
        graph.bind(AssetId::new(2));

        let index = SpatialIndex::from_assets(&assets);
        let candidates = resolver().candidates(AssetId::new(2), &assets, &graph, &index);
        assert!(candidates.iter().all(|p| p.owner() != AssetId::new(2)));
        assert!(!candidates.is_empty());
    }

    #[test]
    fn unknown_asset_is_an_error() {
        let assets = assets_at(&[0.0, 0.2]);
        let mut graph = JointGraph::new();
        assert!(resolver()
            .attempt_bind(AssetId::new(5), &assets, &mut graph, false)
            .is_err());
    }

    #[test]
    fn role_of_index() {
        assert_eq!(AssetRole::of(AssetId::new(0)), AssetRole::First);
        assert_eq!(AssetRole::of(AssetId::new(3)), AssetRole::Subsequent);
    }
}
