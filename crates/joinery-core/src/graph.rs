//! Joint graph: which assets belong to the bound group.
//!
//! The bound group is the growing structure. An asset is either free-standing
//! or a member of the group; there is no partial membership. Joint points
//! follow their owning asset, so binding an asset makes all of its points
//! valid bind targets at once.
//!
//! Members are kept in bind order. That order is the order in which the
//! group's points are offered as candidates, which matters for tie-breaking.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asset::{AssetId, AssetSet, JointPointRef};
use crate::error::{AssemblyError, AssemblyResult};

/// Membership of assets in the bound group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointGraph {
    /// Members in bind order.
    members: Vec<AssetId>,
    /// Membership lookup.
    bound: BTreeSet<AssetId>,
}

impl JointGraph {
    /// Creates an empty graph: every asset free-standing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `asset` into the bound group.
    ///
    /// Binding an already-bound asset is a no-op. Returns true if the asset
    /// was newly bound.
    pub fn bind(&mut self, asset: AssetId) -> bool {
        if !self.bound.insert(asset) {
            return false;
        }
        self.members.push(asset);
        debug!(asset = asset.as_u32(), members = self.members.len(), "Bound asset");
        true
    }

    /// Removes `asset` from the bound group. Returns true if it was bound.
    pub fn detach(&mut self, asset: AssetId) -> bool {
        if !self.bound.remove(&asset) {
            return false;
        }
        self.members.retain(|m| *m != asset);
        true
    }

    /// Returns true if `asset` is a member of the bound group.
    #[must_use]
    pub fn is_bound(&self, asset: AssetId) -> bool {
        self.bound.contains(&asset)
    }

    /// Returns the bound group members in bind order.
    #[must_use]
    pub fn members(&self) -> &[AssetId] {
        &self.members
    }

    /// Returns the number of bound assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the joint points of `asset`, optionally leaving one out.
    #[must_use]
    pub fn children_of(
        assets: &AssetSet,
        asset: AssetId,
        excluding: Option<JointPointRef>,
    ) -> Vec<JointPointRef> {
        assets
            .point_refs(asset)
            .into_iter()
            .filter(|point| Some(*point) != excluding)
            .collect()
    }

    /// Returns one point list per bound member, in bind order.
    #[must_use]
    pub fn member_points(&self, assets: &AssetSet) -> Vec<Vec<JointPointRef>> {
        self.members
            .iter()
            .map(|member| assets.point_refs(*member))
            .collect()
    }

    /// Flattens point lists, dropping every point owned by `owner`.
    #[must_use]
    pub fn exclude_owned_by(point_lists: &[Vec<JointPointRef>], owner: AssetId) -> Vec<JointPointRef> {
        point_lists
            .iter()
            .flatten()
            .filter(|point| point.owner() != owner)
            .copied()
            .collect()
    }

    /// Detaches every asset and restores initial poses in processing order.
    ///
    /// Positions come from `initial_positions` (indexed like `assets`) and
    /// rotations return to zero. Calling this twice in a row leaves the same
    /// state as calling it once.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::UnknownAsset`] if `initial_positions` does not
    /// cover every asset; nothing is modified in that case.
    pub fn reset_all(&mut self, assets: &mut AssetSet, initial_positions: &[Vec3]) -> AssemblyResult<()> {
        if let Some(missing) = assets.id_at(initial_positions.len()) {
            return Err(AssemblyError::UnknownAsset(missing));
        }

        self.members.clear();
        self.bound.clear();
        for (asset, position) in assets.iter_mut().zip(initial_positions) {
            asset.reset_pose(*position);
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
    use crate::asset::{Asset, JointPoint};

    fn two_points() -> Vec<JointPoint> {
        vec![
            JointPoint::new("a", Vec3::new(-0.5, 0.0, 0.0)),
            JointPoint::new("b", Vec3::new(0.5, 0.0, 0.0)),
        ]
    }

    fn three_assets() -> AssetSet {
        AssetSet::new(vec![
            Asset::new("a0", Vec3::ZERO, two_points()),
            Asset::new("a1", Vec3::new(1.0, 0.0, 0.0), two_points()),
            Asset::new("a2", Vec3::new(2.0, 0.0, 0.0), two_points()),
        ])
        .unwrap()
    }

    mod bind_tests {
        use super::*;

        #[test]
        fn bind_records_members_in_order() {
            let mut graph = JointGraph::new();
            assert!(graph.bind(AssetId::new(2)));
            assert!(graph.bind(AssetId::new(0)));

            assert_eq!(graph.members(), &[AssetId::new(2), AssetId::new(0)]);
            assert!(graph.is_bound(AssetId::new(0)));
            assert!(!graph.is_bound(AssetId::new(1)));
        }

        #[test]
        fn bind_is_idempotent() {
            let mut graph = JointGraph::new();
            assert!(graph.bind(AssetId::new(1)));
            assert!(!graph.bind(AssetId::new(1)));
            assert_eq!(graph.len(), 1);
        }

        #[test]
        fn detach_removes_member() {
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(0));
            graph.bind(AssetId::new(1));

            assert!(graph.detach(AssetId::new(0)));
            assert!(!graph.detach(AssetId::new(0)));
            assert_eq!(graph.members(), &[AssetId::new(1)]);
        }
    }

    mod point_tests {
        use super::*;

        #[test]
        fn children_of_with_exclusion() {
            let assets = three_assets();
            let all = JointGraph::children_of(&assets, AssetId::new(1), None);
            assert_eq!(all.len(), 2);

            let skip = JointPointRef::new(AssetId::new(1), 0);
            let rest = JointGraph::children_of(&assets, AssetId::new(1), Some(skip));
            assert_eq!(rest, vec![JointPointRef::new(AssetId::new(1), 1)]);
        }

        #[test]
        fn exclude_owned_by_flattens_and_filters() {
            let assets = three_assets();
            let lists = vec![
                assets.point_refs(AssetId::new(0)),
                assets.point_refs(AssetId::new(1)),
                assets.point_refs(AssetId::new(0)),
            ];

            let filtered = JointGraph::exclude_owned_by(&lists, AssetId::new(0));
            assert_eq!(filtered.len(), 2);
            assert!(filtered.iter().all(|p| p.owner() == AssetId::new(1)));
        }

        #[test]
        fn member_points_follow_bind_order() {
            let assets = three_assets();
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(2));
            graph.bind(AssetId::new(1));

            let lists = graph.member_points(&assets);
            assert_eq!(lists[0][0].owner(), AssetId::new(2));
            assert_eq!(lists[1][0].owner(), AssetId::new(1));
        }
    }

    mod reset_tests {
        use super::*;

        #[test]
        fn reset_all_restores_poses_and_membership() {
            let mut assets = three_assets();
            let initial = assets.positions();
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(0));
            graph.bind(AssetId::new(1));

            for asset in assets.iter_mut() {
                asset.translate(Vec3::new(0.0, 3.0, 0.0));
                asset.rotate(Vec3::new(10.0, 20.0, 30.0));
            }

            graph.reset_all(&mut assets, &initial).unwrap();

            assert!(graph.is_empty());
            assert_eq!(assets.positions(), initial);
            assert!(assets.iter().all(|a| a.rotation() == Vec3::ZERO));
        }

        #[test]
        fn reset_all_is_idempotent() {
            let mut assets = three_assets();
            let initial = assets.positions();
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(2));
            assets.get_mut(AssetId::new(2)).unwrap().translate(Vec3::ONE);

            graph.reset_all(&mut assets, &initial).unwrap();
            let (once_assets, once_graph) = (assets.clone(), graph.clone());
            graph.reset_all(&mut assets, &initial).unwrap();

            assert_eq!(assets, once_assets);
            assert_eq!(graph, once_graph);
        }

        #[test]
        fn reset_all_rejects_short_snapshot() {
            let mut assets = three_assets();
            let mut graph = JointGraph::new();
            graph.bind(AssetId::new(0));

            let result = graph.reset_all(&mut assets, &[Vec3::ZERO]);
            assert!(matches!(result, Err(AssemblyError::UnknownAsset(id)) if id == AssetId::new(1)));
            assert!(graph.is_bound(AssetId::new(0)));
        }
    }
}
