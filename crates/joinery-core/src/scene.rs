//! Scene providers: where the assets of an environment come from.
//!
//! A [`SceneProvider`] is asked exactly once, when an environment is built,
//! for the full [`AssetSet`]. Two providers are included:
//!
//! - [`SceneDescription`]: an explicit list of assets, usually loaded from JSON
//! - [`ScatterLayout`]: assets sharing one joint template, scattered by a
//!   seeded RNG
//!
//! # Ordering
//!
//! Both providers order assets by name (byte-wise), which becomes the
//! processing order of every episode.
//!
//! # Example
//!
//! ```
//! use joinery_core::scene::{ScatterLayout, SceneProvider};
//!
//! let layout = ScatterLayout::new(6, 42);
//! let a = layout.populate().unwrap();
//! let b = layout.populate().unwrap();
//! assert_eq!(a, b);
//! ```

use std::path::Path;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetSet, JointPoint};
use crate::error::AssemblyResult;

/// Source of the assets for an environment.
pub trait SceneProvider {
    /// Builds the asset set.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene violates the [`AssetSet`] invariants.
    fn populate(&self) -> AssemblyResult<AssetSet>;
}

impl SceneProvider for AssetSet {
    fn populate(&self) -> AssemblyResult<AssetSet> {
        Ok(self.clone())
    }
}

/// A joint point as written in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointPointSpec {
    /// Point label.
    pub label: String,
    /// Offset from the asset origin.
    pub offset: Vec3,
}

impl JointPointSpec {
    /// Creates a point spec.
    #[must_use]
    pub fn new(label: impl Into<String>, offset: Vec3) -> Self {
        Self {
            label: label.into(),
            offset,
        }
    }

    fn build(&self) -> JointPoint {
        JointPoint::new(self.label.clone(), self.offset)
    }
}

/// An asset as written in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Asset name; determines processing order.
    pub name: String,
    /// Initial position.
    pub position: Vec3,
    /// Initial rotation in degrees.
    #[serde(default)]
    pub rotation: Vec3,
    /// Joint points.
    pub joint_points: Vec<JointPointSpec>,
}

/// An explicit scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Assets in any order.
    pub assets: Vec<AssetSpec>,
}

impl SceneDescription {
    /// Parses a scene from JSON.
    ///
    /// # Errors
    ///
    /// Returns a JSON error for malformed input.
    pub fn from_json_str(json: &str) -> AssemblyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON scene file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a JSON error for
    /// malformed content.
    pub fn from_path(path: impl AsRef<Path>) -> AssemblyResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl SceneProvider for SceneDescription {
    fn populate(&self) -> AssemblyResult<AssetSet> {
        let mut specs: Vec<&AssetSpec> = self.assets.iter().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));

        let assets = specs
            .into_iter()
            .map(|spec| {
                Asset::new(
                    spec.name.clone(),
                    spec.position,
                    spec.joint_points.iter().map(JointPointSpec::build).collect(),
                )
                .with_rotation(spec.rotation)
            })
            .collect();
        AssetSet::new(assets)
    }
}

/// Assets with a shared joint template, scattered deterministically.
///
/// Positions are drawn uniformly from `center ± extent` per axis with a
/// `ChaCha8Rng` seeded from `seed`, so one layout always yields the same
/// scene on every platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterLayout {
    /// Number of assets.
    pub count: usize,
    /// RNG seed.
    pub seed: u64,
    /// Center of the scatter volume.
    pub center: Vec3,
    /// Half-size of the scatter volume per axis.
    pub extent: Vec3,
    /// Joint points given to every asset.
    pub joint_template: Vec<JointPointSpec>,
}

impl ScatterLayout {
    /// Creates a layout of `count` assets with the default volume and a
    /// three-point joint template.
    #[must_use]
    pub fn new(count: usize, seed: u64) -> Self {
        Self {
            count,
            seed,
            center: Vec3::new(0.0, 0.5, 0.0),
            extent: Vec3::new(4.0, 0.5, 4.0),
            joint_template: vec![
                JointPointSpec::new("left", Vec3::new(-0.5, 0.0, 0.0)),
                JointPointSpec::new("right", Vec3::new(0.5, 0.0, 0.0)),
                JointPointSpec::new("top", Vec3::new(0.0, 0.5, 0.0)),
            ],
        }
    }

    /// Replaces the joint template.
    #[must_use]
    pub fn with_joint_template(mut self, template: Vec<JointPointSpec>) -> Self {
        self.joint_template = template;
        self
    }

    /// Replaces the scatter volume.
    #[must_use]
    pub fn with_volume(mut self, center: Vec3, extent: Vec3) -> Self {
        self.center = center;
        self.extent = extent.abs();
        self
    }
}

impl SceneProvider for ScatterLayout {
    fn populate(&self) -> AssemblyResult<AssetSet> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let extent = self.extent.abs();
        let width = self.count.to_string().len();

        let assets = (0..self.count)
            .map(|i| {
                let offset = Vec3::new(
                    rng.gen_range(-extent.x..=extent.x),
                    rng.gen_range(-extent.y..=extent.y),
                    rng.gen_range(-extent.z..=extent.z),
                );
                // Zero-padded so name order matches generation order.
                Asset::new(
                    format!("asset_{i:0width$}"),
                    self.center + offset,
                    self.joint_template.iter().map(JointPointSpec::build).collect(),
                )
            })
            .collect();
        AssetSet::new(assets)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssemblyError;

    const SCENE_JSON: &str = r#"{
        "assets": [
            { "name": "b_beam", "position": [1.0, 0.0, 0.0],
              "joint_points": [{ "label": "end", "offset": [0.5, 0.0, 0.0] }] },
            { "name": "a_post", "position": [0.0, 0.0, 0.0], "rotation": [0.0, 90.0, 0.0],
              "joint_points": [{ "label": "top", "offset": [0.0, 1.0, 0.0] }] }
        ]
    }"#;

    mod description_tests {
        use super::*;

        #[test]
        fn populate_sorts_by_name() {
            let scene = SceneDescription::from_json_str(SCENE_JSON).unwrap();
            let assets = scene.populate().unwrap();

            let names: Vec<_> = assets.iter().map(Asset::name).collect();
            assert_eq!(names, vec!["a_post", "b_beam"]);
            assert!((assets.iter().next().unwrap().rotation().y - 90.0).abs() < 1e-5);
        }

        #[test]
        fn invalid_scene_is_rejected() {
            let scene = SceneDescription {
                assets: vec![AssetSpec {
                    name: "only".to_string(),
                    position: Vec3::ZERO,
                    rotation: Vec3::ZERO,
                    joint_points: vec![JointPointSpec::new("p", Vec3::ZERO)],
                }],
            };
            assert!(matches!(scene.populate(), Err(AssemblyError::TooFewAssets(1))));
        }

        #[test]
        fn malformed_json_is_an_error() {
            assert!(matches!(
                SceneDescription::from_json_str("{ \"assets\": 3 }"),
                Err(AssemblyError::Json(_))
            ));
        }
    }

    mod scatter_tests {
        use super::*;

        #[test]
        fn same_seed_same_scene() {
            let a = ScatterLayout::new(12, 7).populate().unwrap();
            let b = ScatterLayout::new(12, 7).populate().unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn different_seed_different_positions() {
            let a = ScatterLayout::new(12, 7).populate().unwrap();
            let b = ScatterLayout::new(12, 8).populate().unwrap();
            assert_ne!(a.positions(), b.positions());
        }

        #[test]
        fn positions_stay_in_volume() {
            let layout = ScatterLayout::new(50, 3).with_volume(Vec3::ZERO, Vec3::new(2.0, 1.0, 3.0));
            let assets = layout.populate().unwrap();
            for position in assets.positions() {
                assert!(position.x.abs() <= 2.0);
                assert!(position.y.abs() <= 1.0);
                assert!(position.z.abs() <= 3.0);
            }
        }

        #[test]
        fn names_keep_numeric_order() {
            let assets = ScatterLayout::new(12, 1).populate().unwrap();
            assert_eq!(assets.iter().nth(2).unwrap().name(), "asset_02");
            assert_eq!(assets.iter().nth(10).unwrap().name(), "asset_10");
            assert_eq!(assets.points_per_asset(), 3);
        }
    }
}
