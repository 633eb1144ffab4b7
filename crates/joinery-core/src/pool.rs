//! Batches of independent environments stepped in parallel.
//!
//! Each environment is still strictly sequential; the pool only spreads
//! whole environments across the rayon thread pool. Nothing is shared
//! between environments, so results do not depend on scheduling.
//!
//! # Example
//!
//! ```
//! use joinery_core::config::EnvConfig;
//! use joinery_core::episode::Action;
//! use joinery_core::pool::EnvPool;
//!
//! let mut pool = EnvPool::from_scatter(4, 6, 100, &EnvConfig::default()).unwrap();
//! let observations = pool.reset_all().unwrap();
//! assert_eq!(observations.len(), 4);
//!
//! let outcomes = pool.step_all(&[Action::default(); 4], 0.02).unwrap();
//! assert_eq!(outcomes.len(), 4);
//! ```

use rayon::prelude::*;
use tracing::debug;

use crate::config::EnvConfig;
use crate::episode::{Action, EpisodeController, StepOutcome};
use crate::error::{AssemblyError, AssemblyResult};
use crate::feedback::{Feedback, NullFeedback};
use crate::observation::Observation;
use crate::scene::ScatterLayout;

/// A fixed set of environments.
#[derive(Debug)]
pub struct EnvPool<F: Feedback = NullFeedback> {
    envs: Vec<EpisodeController<F>>,
}

impl EnvPool<NullFeedback> {
    /// Builds `count` environments of `assets_per_env` scattered assets.
    /// Environment `i` uses seed `base_seed + i`.
    ///
    /// # Errors
    ///
    /// Returns the first construction error.
    pub fn from_scatter(
        count: usize,
        assets_per_env: usize,
        base_seed: u64,
        config: &EnvConfig,
    ) -> AssemblyResult<Self> {
        let envs = (0..count as u64)
            .map(|i| {
                let layout = ScatterLayout::new(assets_per_env, base_seed.wrapping_add(i));
                EpisodeController::new(&layout, config.clone())
            })
            .collect::<AssemblyResult<Vec<_>>>()?;
        Ok(Self::new(envs))
    }
}

impl<F: Feedback> EnvPool<F> {
    /// Wraps already-built environments.
    #[must_use]
    pub fn new(envs: Vec<EpisodeController<F>>) -> Self {
        Self { envs }
    }

    /// Number of environments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.envs.len()
    }

    /// Returns true if the pool holds no environments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    /// Returns environment `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&EpisodeController<F>> {
        self.envs.get(index)
    }

    /// Returns environment `index` mutably, e.g. to deliver contact events.
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut EpisodeController<F>> {
        self.envs.get_mut(index)
    }

    /// Iterates environments in order.
    pub fn iter(&self) -> impl Iterator<Item = &EpisodeController<F>> + '_ {
        self.envs.iter()
    }

    /// Resets every environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any environment fails to reset.
    pub fn reset_all(&mut self) -> AssemblyResult<Vec<Observation>> {
        self.envs.par_iter_mut().map(EpisodeController::reset).collect()
    }

    /// Resets only the environments whose episode was reported finished.
    /// Returns their indices with the new observations.
    ///
    /// # Errors
    ///
    /// Returns an error if any of those environments fails to reset.
    pub fn reset_finished(&mut self) -> AssemblyResult<Vec<(usize, Observation)>> {
        let reset: Vec<(usize, Observation)> = self
            .envs
            .par_iter_mut()
            .enumerate()
            .filter(|(_, env)| env.state().is_finished())
            .map(|(index, env)| env.reset().map(|obs| (index, obs)))
            .collect::<AssemblyResult<_>>()?;
        debug!(count = reset.len(), "Reset finished environments");
        Ok(reset)
    }

    /// Steps environment `i` with `actions[i]`.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::BatchSizeMismatch`] if `actions` does not match the
    ///   pool size; no environment is stepped in that case
    /// - any step error, e.g. [`AssemblyError::EpisodeFinished`]; the other
    ///   environments may or may not have been stepped
    pub fn step_all(&mut self, actions: &[Action], dt: f32) -> AssemblyResult<Vec<StepOutcome>> {
        if actions.len() != self.envs.len() {
            return Err(AssemblyError::BatchSizeMismatch {
                expected: self.envs.len(),
                found: actions.len(),
            });
        }
        self.envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, action)| env.step(action, dt))
            .collect()
    }
}
