//! Episode controller: the state machine of one assembly attempt.
//!
//! One asset is active at a time. Each [`EpisodeController::step`] moves the
//! active asset by the action, asks the [`BindingResolver`] whether it joins
//! the structure, shapes the reward and builds the next observation.
//!
//! # Phases
//!
//! ```text
//! Assembling ──(last asset bound)──► Success ──┐
//!     │                                        ├──► reset ──► Assembling
//!     └──────(failure trigger)──────► Failure ─┘
//! ```
//!
//! A terminal transition is reported by exactly one step (`done == true`).
//! A trigger that fires between steps is reported by the next step, which
//! applies no action. Stepping again before [`EpisodeController::reset`] is
//! an [`AssemblyError::EpisodeFinished`] error.
//!
//! The trigger penalty enters [`EpisodeState::cumulative_reward`] at once. A
//! reset that comes before the reporting step keeps it readable through
//! [`EpisodeState::unreported_reward`].
//!
//! # Index Progression
//!
//! After a bind the index moves to the next asset that is not bound yet, so
//! the partner of a seed bind is skipped. Completion happens when the last
//! asset binds, or when that search runs past the last asset; the index is
//! then clamped to `N-1`. The index never decreases within an episode.
//!
//! # Resets
//!
//! A reset in the middle of an assembly (`0 < index < N-1`) only returns the
//! active asset to its initial pose, so progress carries over. Otherwise every
//! asset is detached and restored, the index returns to 0 and the history
//! window is cleared. The collision flag belongs to the contact source and is
//! never changed by a reset.

use std::ops::Range;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::asset::{AssetId, AssetSet};
use crate::binding::{BindOutcome, BindingResolver};
use crate::config::EnvConfig;
use crate::error::{AssemblyError, AssemblyResult};
use crate::feedback::{AssemblySnapshot, AssetMark, Feedback, GroundMark, NullFeedback};
use crate::graph::JointGraph;
use crate::observation::{HistoryWindow, Observation, ObservationBuilder, ObservationLayout};
use crate::scene::SceneProvider;
use crate::spatial::SpatialIndex;

// =============================================================================
// State
// =============================================================================

/// Lifecycle phase of an episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodePhase {
    /// Assets are still being placed.
    #[default]
    Assembling,
    /// Every asset joined the structure.
    Success,
    /// The failure trigger fired.
    Failure,
}

impl EpisodePhase {
    /// Returns true for `Success` and `Failure`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Assembling)
    }
}

bitflags! {
    /// Per-step flags of an episode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EpisodeFlags: u8 {
        /// The active asset is in contact with something; binding is suppressed.
        const COLLIDED = 0b0000_0001;
        /// The last bind attempt succeeded.
        const CONNECTED = 0b0000_0010;
    }
}

/// Mutable bookkeeping of the current episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    current: AssetId,
    flags: EpisodeFlags,
    phase: EpisodePhase,
    cumulative_reward: f32,
    /// Reward earned between steps, paid out by the next step.
    pending_reward: f32,
    /// Pending reward the previous episode ended with before any step
    /// reported it.
    unreported_reward: f32,
    steps: u32,
    /// Whether the terminal transition was returned to the consumer.
    reported: bool,
    /// Initial position per asset, captured once at construction.
    initial_positions: Vec<Vec3>,
}

impl EpisodeState {
    fn new(initial_positions: Vec<Vec3>) -> Self {
        Self {
            current: AssetId::new(0),
            flags: EpisodeFlags::empty(),
            phase: EpisodePhase::Assembling,
            cumulative_reward: 0.0,
            pending_reward: 0.0,
            unreported_reward: 0.0,
            steps: 0,
            reported: false,
            initial_positions,
        }
    }

    /// Active asset.
    #[must_use]
    pub const fn current(&self) -> AssetId {
        self.current
    }

    /// Collision and connection flags.
    #[must_use]
    pub const fn flags(&self) -> EpisodeFlags {
        self.flags
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> EpisodePhase {
        self.phase
    }

    /// Sum of rewards earned since the last reset, including a trigger
    /// penalty no step has reported yet.
    #[must_use]
    pub const fn cumulative_reward(&self) -> f32 {
        self.cumulative_reward
    }

    /// Steps since the last reset.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    /// Whether the episode ended and was reported.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.reported
    }

    /// Reward the previous episode earned between its last step and the
    /// reset, such as a trigger penalty followed directly by a reset.
    #[must_use]
    pub const fn unreported_reward(&self) -> f32 {
        self.unreported_reward
    }

    /// Initial asset positions in processing order.
    #[must_use]
    pub fn initial_positions(&self) -> &[Vec3] {
        &self.initial_positions
    }

    fn begin(&mut self) {
        self.phase = EpisodePhase::Assembling;
        self.flags.remove(EpisodeFlags::CONNECTED);
        self.cumulative_reward = 0.0;
        self.unreported_reward = std::mem::take(&mut self.pending_reward);
        self.steps = 0;
        self.reported = false;
    }
}

// =============================================================================
// Actions and outcomes
// =============================================================================

/// Number of continuous action components.
pub const ACTION_SIZE: usize = 6;

/// Translation and rotation input for the active asset.
///
/// Components are unit-less; the controller scales translation by the move
/// speed and rotation by the rotation speed, both per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Translation input (X, Y, Z).
    pub translation: Vec3,
    /// Rotation input (X, Y, Z).
    pub rotation: Vec3,
}

impl Action {
    /// Creates an action.
    #[must_use]
    pub const fn new(translation: Vec3, rotation: Vec3) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Builds an action from `[tx, ty, tz, rx, ry, rz]`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::InvalidAction`] unless exactly six values
    /// are given.
    pub fn from_slice(values: &[f32]) -> AssemblyResult<Self> {
        match values {
            [tx, ty, tz, rx, ry, rz] => Ok(Self::new(
                Vec3::new(*tx, *ty, *tz),
                Vec3::new(*rx, *ry, *rz),
            )),
            _ => Err(AssemblyError::InvalidAction(values.len())),
        }
    }

    /// Returns `[tx, ty, tz, rx, ry, rz]`.
    #[must_use]
    pub fn to_array(&self) -> [f32; ACTION_SIZE] {
        let [tx, ty, tz] = self.translation.to_array();
        let [rx, ry, rz] = self.rotation.to_array();
        [tx, ty, tz, rx, ry, rz]
    }

    /// Manual control: the horizontal axis drives X translation and the
    /// vertical axis drives Z rotation.
    #[must_use]
    pub fn heuristic(horizontal: f32, vertical: f32, move_speed: f32, dt: f32) -> Self {
        Self::new(
            Vec3::new(horizontal * move_speed * dt, 0.0, 0.0),
            Vec3::new(0.0, 0.0, vertical * move_speed * dt),
        )
    }
}

impl From<[f32; ACTION_SIZE]> for Action {
    fn from(values: [f32; ACTION_SIZE]) -> Self {
        let [tx, ty, tz, rx, ry, rz] = values;
        Self::new(Vec3::new(tx, ty, tz), Vec3::new(rx, ry, rz))
    }
}

/// Result of one [`EpisodeController::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Observation after the step.
    pub observation: Observation,
    /// Reward earned by this step.
    pub reward: f32,
    /// Whether the episode ended with this step.
    pub done: bool,
    /// Whether the end came from the step limit rather than a terminal phase.
    pub truncated: bool,
    /// Phase after the step.
    pub phase: EpisodePhase,
    /// Whether the active asset bound during this step.
    pub connected: bool,
}

/// Receiver of contact events from the physics host.
pub trait ContactListener {
    /// The active asset started touching something.
    fn on_collision_enter(&mut self);
    /// The active asset stopped touching.
    fn on_collision_exit(&mut self);
    /// A failure volume was entered.
    fn on_trigger_enter(&mut self);
}

// =============================================================================
// Controller
// =============================================================================

/// Drives one environment through its episodes.
#[derive(Debug)]
pub struct EpisodeController<F: Feedback = NullFeedback> {
    config: EnvConfig,
    assets: AssetSet,
    graph: JointGraph,
    resolver: BindingResolver,
    builder: ObservationBuilder,
    history: HistoryWindow,
    state: EpisodeState,
    feedback: F,
}

impl EpisodeController<NullFeedback> {
    /// Builds a controller without feedback.
    ///
    /// # Errors
    ///
    /// Returns a config error if `config` is invalid, or whatever the scene
    /// provider reports.
    pub fn new(scene: &impl SceneProvider, config: EnvConfig) -> AssemblyResult<Self> {
        Self::with_feedback(scene, config, NullFeedback)
    }
}

impl<F: Feedback> EpisodeController<F> {
    /// Builds a controller reporting to `feedback`.
    ///
    /// The scene is populated once and every initial position is captured.
    ///
    /// # Errors
    ///
    /// Returns a config error if `config` is invalid, or whatever the scene
    /// provider reports.
    pub fn with_feedback(
        scene: &impl SceneProvider,
        config: EnvConfig,
        feedback: F,
    ) -> AssemblyResult<Self> {
        config.validate()?;
        let assets = scene.populate()?;

        let layout = ObservationLayout::new(
            assets.points_per_asset(),
            config.neighbor_count,
            config.max_history,
        );
        let state = EpisodeState::new(assets.positions());

        info!(
            assets = assets.len(),
            points_per_asset = assets.points_per_asset(),
            observation_size = layout.len(),
            "Assembly environment created"
        );

        Ok(Self {
            resolver: BindingResolver::from_config(&config),
            builder: ObservationBuilder::new(layout),
            history: HistoryWindow::new(config.max_history, assets.points_per_asset()),
            graph: JointGraph::new(),
            config,
            assets,
            state,
            feedback,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// All assets in processing order.
    #[must_use]
    pub fn assets(&self) -> &AssetSet {
        &self.assets
    }

    /// Bound group membership.
    #[must_use]
    pub fn graph(&self) -> &JointGraph {
        &self.graph
    }

    /// Episode bookkeeping.
    #[must_use]
    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    /// History window as of the last observation.
    #[must_use]
    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    /// Active asset.
    #[must_use]
    pub const fn current(&self) -> AssetId {
        self.state.current
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> EpisodePhase {
        self.state.phase
    }

    /// Whether binding is currently suppressed by a contact.
    #[must_use]
    pub const fn is_collided(&self) -> bool {
        self.state.flags.contains(EpisodeFlags::COLLIDED)
    }

    /// Whether the last bind attempt succeeded.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.state.flags.contains(EpisodeFlags::CONNECTED)
    }

    /// Observation layout.
    #[must_use]
    pub const fn observation_layout(&self) -> ObservationLayout {
        self.builder.layout()
    }

    /// Length of every observation.
    #[must_use]
    pub const fn observation_size(&self) -> usize {
        self.builder.layout().len()
    }

    /// Feedback sink.
    #[must_use]
    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    /// Mutable feedback sink.
    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    /// Deterministic hash of the episode state, see [`crate::hash`].
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        crate::hash::hash_episode(&self.assets, &self.graph, &self.state, &self.history)
    }

    // ========================================================================
    // Episode lifecycle
    // ========================================================================

    /// Begins a new episode and returns its first observation.
    ///
    /// # Errors
    ///
    /// Returns an error only if the captured initial positions no longer
    /// cover the asset set, which construction rules out.
    pub fn reset(&mut self) -> AssemblyResult<Observation> {
        let last = self.assets.len() - 1;
        let current = self.state.current;

        if current.index() > 0 && current.index() < last {
            self.reset_current(current)?;
            info!(index = current.as_u32(), "Episode resumed mid-assembly");
        } else {
            self.graph
                .reset_all(&mut self.assets, &self.state.initial_positions)?;
            self.state.current = AssetId::new(0);
            self.history.clear();
            for asset in self.assets.iter() {
                self.feedback.mark_asset(asset.id(), AssetMark::Neutral);
            }
            self.feedback.clear_ground();
            info!(assets = self.assets.len(), "Episode reset");
        }

        self.state.begin();
        if self.state.unreported_reward.abs() > f32::EPSILON {
            warn!(
                reward = self.state.unreported_reward,
                "Reset before the pending reward was reported"
            );
        }
        Ok(self.observe())
    }

    /// Applies `action` for `dt` seconds and advances the episode.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::EpisodeFinished`] if the episode already ended and
    ///   was reported; call [`EpisodeController::reset`]
    /// - [`AssemblyError::UnknownAsset`] if the active asset is missing, which
    ///   construction rules out
    pub fn step(&mut self, action: &Action, dt: f32) -> AssemblyResult<StepOutcome> {
        if self.state.reported {
            return Err(AssemblyError::EpisodeFinished);
        }
        if self.state.phase.is_terminal() {
            return Ok(self.finish_step(0.0, false));
        }

        let current = self.state.current;
        let asset = self
            .assets
            .get_mut(current)
            .ok_or(AssemblyError::UnknownAsset(current))?;
        asset.translate(action.translation * self.config.move_speed * dt);
        asset.rotate(action.rotation * self.config.rot_speed * dt);
        self.state.steps += 1;

        let collided = self.is_collided();
        let outcome = self
            .resolver
            .attempt_bind(current, &self.assets, &mut self.graph, collided)?;
        self.state
            .flags
            .set(EpisodeFlags::CONNECTED, outcome.connected);

        let reward = if outcome.connected {
            self.on_connected(current, &outcome)
        } else {
            0.0
        };
        Ok(self.finish_step(reward, outcome.connected))
    }

    /// Builds the observation for the active asset, refreshing the history.
    pub fn observe(&mut self) -> Observation {
        let index = SpatialIndex::from_assets(&self.assets);
        self.builder
            .build(self.state.current, &self.assets, &index, &mut self.history)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn reset_current(&mut self, current: AssetId) -> AssemblyResult<()> {
        let initial = self
            .state
            .initial_positions
            .get(current.index())
            .copied()
            .ok_or(AssemblyError::UnknownAsset(current))?;
        let asset = self
            .assets
            .get_mut(current)
            .ok_or(AssemblyError::UnknownAsset(current))?;
        asset.reset_pose(initial);
        self.graph.detach(current);
        self.feedback.mark_asset(current, AssetMark::Neutral);
        Ok(())
    }

    /// Rewards a bind, moves the index and handles completion.
    // Asset indices stay far below 2^24, so they are exact as f32.
    #[allow(clippy::cast_precision_loss)]
    fn on_connected(&mut self, current: AssetId, outcome: &BindOutcome) -> f32 {
        let mut reward = (current.index() + 1) as f32;
        let completed = self.advance(current);

        // Seed pairs and the final asset are not marked.
        if outcome.connected_with.is_none() && !completed {
            self.feedback.mark_asset(current, AssetMark::InProgress);
        }

        if completed {
            reward += self.completion_reward();
            self.state.phase = EpisodePhase::Success;
            self.feedback.mark_ground(GroundMark::Success);
            let snapshot = AssemblySnapshot::capture(&self.assets, &self.graph);
            self.feedback.assembly_completed(&snapshot);
            info!(
                steps = self.state.steps,
                reward = self.state.cumulative_reward + reward,
                "Assembly complete"
            );
        }
        reward
    }

    /// Moves to the next unbound asset. Returns true if none is left.
    fn advance(&mut self, current: AssetId) -> bool {
        let last = self.assets.len() - 1;
        if current.index() == last {
            return true;
        }

        let mut next = current.index() + 1;
        while self
            .assets
            .id_at(next)
            .is_some_and(|id| self.graph.is_bound(id))
        {
            next += 1;
        }

        match self.assets.id_at(next) {
            Some(id) => {
                debug!(from = current.as_u32(), to = id.as_u32(), "Advanced to next asset");
                self.state.current = id;
                false
            }
            None => {
                self.state.current = self.assets.id_at(last).unwrap_or(current);
                true
            }
        }
    }

    /// Completion bonus plus the height band terms.
    #[allow(clippy::cast_precision_loss)]
    fn completion_reward(&self) -> f32 {
        let rewards = &self.config.rewards;
        let bands = &self.config.height_bands;
        let total = self.assets.len() as f32;
        let fraction = |band: &Range<f32>| {
            let inside = self
                .assets
                .iter()
                .filter(|asset| band.contains(&asset.position().y))
                .count();
            inside as f32 / total
        };

        let low = fraction(&bands.low);
        let high = fraction(&bands.high);
        let band_term = |hit: bool| if hit { rewards.band_bonus } else { rewards.band_penalty };

        debug!(low, high, "Height distribution");
        rewards.completion_bonus
            + band_term(bands.low_target.contains(low))
            + band_term(bands.high_target.contains(high))
    }

    fn finish_step(&mut self, reward: f32, connected: bool) -> StepOutcome {
        // Pending reward was counted when it was earned.
        self.state.cumulative_reward += reward;
        let reward = reward + std::mem::take(&mut self.state.pending_reward);

        let limit = self.config.max_steps;
        let truncated =
            !self.state.phase.is_terminal() && limit > 0 && self.state.steps >= limit;
        if truncated {
            warn!(steps = self.state.steps, index = self.state.current.as_u32(), "Episode truncated");
        }
        let done = self.state.phase.is_terminal() || truncated;
        self.state.reported = done;

        StepOutcome {
            observation: self.observe(),
            reward,
            done,
            truncated,
            phase: self.state.phase,
            connected,
        }
    }
}

impl<F: Feedback> ContactListener for EpisodeController<F> {
    fn on_collision_enter(&mut self) {
        self.state.flags.insert(EpisodeFlags::COLLIDED);
    }

    fn on_collision_exit(&mut self) {
        self.state.flags.remove(EpisodeFlags::COLLIDED);
    }

    fn on_trigger_enter(&mut self) {
        if self.state.reported || self.state.phase == EpisodePhase::Failure {
            return;
        }
        let penalty = self.config.rewards.failure_penalty;
        self.state.pending_reward += penalty;
        self.state.cumulative_reward += penalty;
        self.state.phase = EpisodePhase::Failure;
        self.feedback.mark_ground(GroundMark::Failure);
        info!(index = self.state.current.as_u32(), "Failure trigger entered");
    }
}

// =============================================================================
// Tests
// =============================================================================
