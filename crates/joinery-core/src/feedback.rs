//! One-way notifications from the environment to its host.
//!
//! The controller reports visual state changes (asset and ground marks) and
//! hands over a snapshot of the finished structure. Nothing flows back: every
//! method returns `()`, and a failing sink must not disturb the episode.
//!
//! Three sinks are provided:
//! - [`NullFeedback`] ignores everything (the default for training)
//! - [`RecordingFeedback`] keeps every event in order, for tests and replays
//! - [`JsonExporter`] writes completed structures as JSON snapshot files

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::asset::{AssetId, AssetSet};
use crate::config::ExportConfig;
use crate::error::AssemblyResult;
use crate::graph::JointGraph;

/// Visual state of a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetMark {
    /// Untouched or reset.
    Neutral,
    /// Joined to the structure during this episode.
    InProgress,
}

/// Visual state of the ground, reflecting the episode outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroundMark {
    /// Structure completed.
    Success,
    /// Failure trigger fired.
    Failure,
}

/// One bound asset in an [`AssemblySnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAsset {
    /// Asset name.
    pub name: String,
    /// Final position.
    pub position: Vec3,
    /// Final rotation in degrees.
    pub rotation: Vec3,
    /// World positions of the joint points.
    pub joint_points: Vec<Vec3>,
}

/// The bound group at the moment of completion, in bind order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblySnapshot {
    /// Members of the structure.
    pub assets: Vec<SnapshotAsset>,
}

impl AssemblySnapshot {
    /// Captures every bound member of `graph`.
    #[must_use]
    pub fn capture(assets: &AssetSet, graph: &JointGraph) -> Self {
        let assets = graph
            .members()
            .iter()
            .filter_map(|id| assets.get(*id))
            .map(|asset| SnapshotAsset {
                name: asset.name().to_string(),
                position: asset.position(),
                rotation: asset.rotation(),
                joint_points: asset.joint_world_positions(),
            })
            .collect();
        Self { assets }
    }
}

/// Receiver of environment notifications.
///
/// All methods default to doing nothing, so a sink implements only what it
/// renders.
pub trait Feedback: Send {
    /// An asset changed visual state.
    fn mark_asset(&mut self, _asset: AssetId, _mark: AssetMark) {}

    /// The ground changed visual state.
    fn mark_ground(&mut self, _mark: GroundMark) {}

    /// The ground returned to its neutral state at a full reset.
    fn clear_ground(&mut self) {}

    /// The structure was completed.
    fn assembly_completed(&mut self, _snapshot: &AssemblySnapshot) {}
}

/// Feedback sink that discards every notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullFeedback;

impl Feedback for NullFeedback {}

/// A notification captured by [`RecordingFeedback`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeedbackEvent {
    /// See [`Feedback::mark_asset`].
    Asset(AssetId, AssetMark),
    /// See [`Feedback::mark_ground`].
    Ground(GroundMark),
    /// See [`Feedback::clear_ground`].
    GroundCleared,
    /// See [`Feedback::assembly_completed`].
    Completed(AssemblySnapshot),
}

/// Feedback sink that records every notification in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingFeedback {
    events: Vec<FeedbackEvent>,
}

impl RecordingFeedback {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[FeedbackEvent] {
        &self.events
    }

    /// Returns the ground marks, oldest first.
    #[must_use]
    pub fn ground_marks(&self) -> Vec<GroundMark> {
        self.events
            .iter()
            .filter_map(|event| match event {
                FeedbackEvent::Ground(mark) => Some(*mark),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of completed structures reported.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, FeedbackEvent::Completed(_)))
            .count()
    }

    /// Removes all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Feedback for RecordingFeedback {
    fn mark_asset(&mut self, asset: AssetId, mark: AssetMark) {
        self.events.push(FeedbackEvent::Asset(asset, mark));
    }

    fn mark_ground(&mut self, mark: GroundMark) {
        self.events.push(FeedbackEvent::Ground(mark));
    }

    fn clear_ground(&mut self) {
        self.events.push(FeedbackEvent::GroundCleared);
    }

    fn assembly_completed(&mut self, snapshot: &AssemblySnapshot) {
        self.events.push(FeedbackEvent::Completed(snapshot.clone()));
    }
}

// =============================================================================
// JSON export
// =============================================================================

/// Writes each completed structure to a new JSON file.
///
/// Files are named `<prefab_name>.json` inside the export directory. If that
/// file exists, `<prefab_name> 1.json`, `<prefab_name> 2.json`, ... are tried
/// until a free name is found, so earlier exports are never overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonExporter {
    config: ExportConfig,
    written: Vec<PathBuf>,
}

impl JsonExporter {
    /// Creates an exporter. Nothing is written unless `config.enabled`.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            written: Vec::new(),
        }
    }

    /// Returns the paths written so far.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Writes `snapshot` to a fresh file and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created or the file
    /// cannot be written, or a JSON error if serialization fails.
    pub fn export(&mut self, snapshot: &AssemblySnapshot) -> AssemblyResult<PathBuf> {
        std::fs::create_dir_all(&self.config.export_path)?;
        let path = unique_path(&self.config.export_path, &self.config.prefab_name);
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&path, json)?;
        self.written.push(path.clone());
        Ok(path)
    }
}

impl Feedback for JsonExporter {
    fn assembly_completed(&mut self, snapshot: &AssemblySnapshot) {
        if !self.config.enabled {
            return;
        }
        match self.export(snapshot) {
            Ok(path) => info!(path = %path.display(), assets = snapshot.assets.len(), "Exported structure"),
            Err(err) => warn!(error = %err, "Structure export failed"),
        }
    }
}

/// Returns the first `<name>[ n].json` in `dir` that does not exist yet.
#[must_use]
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(format!("{name}.json"));
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| dir.join(format!("{name} {n}.json")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

// =============================================================================
// Tests
// =============================================================================
