//! Asset module: the parts being assembled.
//!
//! This module provides the core data types of the assembly environment:
//! - [`AssetId`]: Unique identifier for an asset, equal to its processing index
//! - [`JointPoint`]: A labeled attachment offset fixed to one asset
//! - [`JointPointRef`]: A lightweight handle naming a point by owner and slot
//! - [`Asset`]: A movable part with a pose and its joint points
//! - [`AssetSet`]: The ordered, validated collection of all assets
//!
//! # Ordering
//!
//! Insertion order into an [`AssetSet`] is the processing order of an episode.
//! Identifiers are assigned from that order, so `AssetId::new(i)` is always
//! the asset at index `i`.
//!
//! # Example
//!
//! ```
//! use joinery_core::asset::{Asset, AssetSet, JointPoint};
//! use glam::Vec3;
//!
//! let point = || vec![JointPoint::new("a", Vec3::X * 0.5)];
//! let assets = AssetSet::new(vec![
//!     Asset::new("beam_0", Vec3::ZERO, point()),
//!     Asset::new("beam_1", Vec3::new(2.0, 0.0, 0.0), point()),
//! ])
//! .unwrap();
//!
//! assert_eq!(assets.len(), 2);
//! assert_eq!(assets.points_per_asset(), 1);
//! ```

use std::fmt;

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{AssemblyError, AssemblyResult};

/// Unique identifier for an asset.
///
/// The wrapped value is the asset's index in its [`AssetSet`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(u32);

impl AssetId {
    /// Creates a new `AssetId` from a raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` value of this identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the processing index this identifier refers to.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AssetId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// A labeled attachment point, stored as an offset in its asset's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointPoint {
    label: String,
    offset: Vec3,
}

impl JointPoint {
    /// Creates a joint point with the given label and local offset.
    #[must_use]
    pub fn new(label: impl Into<String>, offset: Vec3) -> Self {
        Self {
            label: label.into(),
            offset,
        }
    }

    /// Returns the point's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the offset from the owning asset's origin (local frame).
    #[must_use]
    pub const fn offset(&self) -> Vec3 {
        self.offset
    }
}

/// Handle to a joint point: owning asset plus slot within that asset.
///
/// Points never change owner on their own, so the owner recorded here is the
/// point's owner for the lifetime of the asset set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JointPointRef {
    owner: AssetId,
    slot: usize,
}

impl JointPointRef {
    /// Creates a handle for `slot` on `owner`.
    #[must_use]
    pub const fn new(owner: AssetId, slot: usize) -> Self {
        Self { owner, slot }
    }

    /// Returns the asset that owns this point.
    #[must_use]
    pub const fn owner(self) -> AssetId {
        self.owner
    }

    /// Returns the slot of this point within its owner.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot
    }
}

/// A movable part of the structure.
///
/// Rotation is stored as Euler angles in degrees, normalized to `[0, 360)`,
/// applied in Z, X, Y order (intrinsic Y-X-Z).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    id: AssetId,
    name: String,
    position: Vec3,
    rotation: Vec3,
    joint_points: Vec<JointPoint>,
}

impl Asset {
    /// Creates an unrotated asset. The identifier is assigned by [`AssetSet::new`].
    #[must_use]
    pub fn new(name: impl Into<String>, position: Vec3, joint_points: Vec<JointPoint>) -> Self {
        Self {
            id: AssetId::new(0),
            name: name.into(),
            position,
            rotation: Vec3::ZERO,
            joint_points,
        }
    }

    /// Sets the initial rotation (degrees).
    #[must_use]
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = normalize_euler(rotation);
        self
    }

    /// Returns the asset identifier.
    #[must_use]
    pub const fn id(&self) -> AssetId {
        self.id
    }

    /// Returns the asset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the position in the host frame.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Returns the Euler rotation in degrees, each component in `[0, 360)`.
    #[must_use]
    pub const fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Returns the joint points in slot order.
    #[must_use]
    pub fn joint_points(&self) -> &[JointPoint] {
        &self.joint_points
    }

    /// Returns the orientation as a quaternion.
    #[must_use]
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y.to_radians(),
            self.rotation.x.to_radians(),
            self.rotation.z.to_radians(),
        )
    }

    /// Returns the world position of the joint point in `slot`.
    #[must_use]
    pub fn joint_world_position(&self, slot: usize) -> Option<Vec3> {
        let orientation = self.orientation();
        self.joint_points
            .get(slot)
            .map(|point| self.position + orientation * point.offset)
    }

    /// Returns the world positions of all joint points in slot order.
    #[must_use]
    pub fn joint_world_positions(&self) -> Vec<Vec3> {
        let orientation = self.orientation();
        self.joint_points
            .iter()
            .map(|point| self.position + orientation * point.offset)
            .collect()
    }

    /// Moves the asset by `delta`.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Rotates the asset by `delta` degrees per axis.
    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation = normalize_euler(self.rotation + delta);
    }

    /// Places the asset at `position` with zero rotation.
    pub fn reset_pose(&mut self, position: Vec3) {
        self.position = position;
        self.rotation = Vec3::ZERO;
    }
}

fn normalize_euler(angles: Vec3) -> Vec3 {
    Vec3::new(
        angles.x.rem_euclid(360.0),
        angles.y.rem_euclid(360.0),
        angles.z.rem_euclid(360.0),
    )
}

/// The ordered sequence of all assets in an episode.
///
/// # Invariants
///
/// - At least two assets
/// - Every asset carries the same, non-zero number of joint points
/// - `assets[i].id() == AssetId::new(i)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSet {
    assets: Vec<Asset>,
    points_per_asset: usize,
}

impl AssetSet {
    /// Builds a validated asset set, assigning identifiers in insertion order.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::TooFewAssets`] with fewer than two assets
    /// - [`AssemblyError::NoJointPoints`] if any asset has no joint points
    /// - [`AssemblyError::InconsistentJointCount`] if point counts differ
    // Scenes beyond u32::MAX assets are not a supported configuration.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(mut assets: Vec<Asset>) -> AssemblyResult<Self> {
        if assets.len() < 2 {
            return Err(AssemblyError::TooFewAssets(assets.len()));
        }

        let points_per_asset = assets[0].joint_points.len();
        for asset in &assets {
            if asset.joint_points.is_empty() {
                return Err(AssemblyError::NoJointPoints(asset.name.clone()));
            }
            if asset.joint_points.len() != points_per_asset {
                return Err(AssemblyError::InconsistentJointCount {
                    name: asset.name.clone(),
                    expected: points_per_asset,
                    found: asset.joint_points.len(),
                });
            }
        }

        for (index, asset) in assets.iter_mut().enumerate() {
            asset.id = AssetId::new(index as u32);
        }

        Ok(Self {
            assets,
            points_per_asset,
        })
    }

    /// Returns the number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Returns the number of joint points every asset carries.
    #[must_use]
    pub const fn points_per_asset(&self) -> usize {
        self.points_per_asset
    }

    /// Returns the asset with the given identifier.
    #[must_use]
    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id.index())
    }

    /// Returns a mutable reference to the asset with the given identifier.
    #[must_use]
    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.assets.get_mut(id.index())
    }

    /// Returns the asset with the given identifier or an `UnknownAsset` error.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::UnknownAsset`] if `id` is out of range.
    pub fn require(&self, id: AssetId) -> AssemblyResult<&Asset> {
        self.get(id).ok_or(AssemblyError::UnknownAsset(id))
    }

    /// Returns the identifier of the asset at `index`.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<AssetId> {
        self.assets.get(index).map(Asset::id)
    }

    /// Iterates assets in processing order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> + '_ {
        self.assets.iter()
    }

    /// Iterates assets mutably in processing order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Asset> + '_ {
        self.assets.iter_mut()
    }

    /// Returns the joint point handles of `id` in slot order.
    #[must_use]
    pub fn point_refs(&self, id: AssetId) -> Vec<JointPointRef> {
        self.get(id)
            .map(|asset| {
                (0..asset.joint_points.len())
                    .map(|slot| JointPointRef::new(id, slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the world position of a joint point.
    #[must_use]
    pub fn point_position(&self, point: JointPointRef) -> Option<Vec3> {
        self.get(point.owner())
            .and_then(|asset| asset.joint_world_position(point.slot()))
    }

    /// Captures every asset's current position, in processing order.
    #[must_use]
    pub fn positions(&self) -> Vec<Vec3> {
        self.assets.iter().map(Asset::position).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
