//! # Joinery Python Bindings
//!
//! PyO3 bindings exposing the Joinery assembly environment to Python RL
//! tooling.
//!
//! ## Usage
//!
//! ```python
//! from joinery import AssemblyEnv
//!
//! # Scattered scene, reproducible from its seed
//! env = AssemblyEnv.scatter(count=8, seed=42)
//!
//! # Or an explicit scene file with a JSON config
//! env = AssemblyEnv.from_scene("scene.json", config='{"joint_range": 0.25}')
//!
//! obs = env.reset()
//! obs, reward, done, truncated = env.step([0.1, 0.0, 0.0, 0.0, 5.0, 0.0], dt=0.02)
//!
//! # Contacts reported by the physics host
//! env.trigger_enter()
//! ```

use joinery_core::{
    Action, AssemblyError, ContactListener, EnvConfig, EpisodeController, EpisodePhase,
    ExportConfig, JsonExporter, ScatterLayout, SceneDescription, SceneProvider,
};
use numpy::{PyArray1, ToPyArray};
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: AssemblyError) -> PyErr {
    match err {
        AssemblyError::Io(err) => PyIOError::new_err(err.to_string()),
        AssemblyError::EpisodeFinished => PyRuntimeError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn parse_config(config: Option<&str>) -> PyResult<EnvConfig> {
    config
        .map_or_else(|| Ok(EnvConfig::default()), EnvConfig::from_json_str)
        .map_err(to_py_err)
}

/// Episode phase exposed to Python.
#[pyclass(eq, eq_int, hash, frozen)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[allow(non_camel_case_types)] // Python convention uses SCREAMING_SNAKE_CASE for enums
pub enum Phase {
    /// Assets are still being placed
    ASSEMBLING,
    /// Every asset is bound
    SUCCESS,
    /// The failure trigger fired
    FAILURE,
}

impl From<EpisodePhase> for Phase {
    fn from(phase: EpisodePhase) -> Self {
        match phase {
            EpisodePhase::Assembling => Phase::ASSEMBLING,
            EpisodePhase::Success => Phase::SUCCESS,
            EpisodePhase::Failure => Phase::FAILURE,
        }
    }
}

/// Assembly environment wrapper for Python.
///
/// Completed structures are exported as JSON when the config enables it.
#[pyclass(name = "AssemblyEnv")]
pub struct PyAssemblyEnv {
    inner: EpisodeController<JsonExporter>,
}

impl PyAssemblyEnv {
    fn build(scene: &impl SceneProvider, config: EnvConfig) -> PyResult<Self> {
        let exporter = JsonExporter::new(config.export.clone());
        let inner =
            EpisodeController::with_feedback(scene, config, exporter).map_err(to_py_err)?;
        Ok(Self { inner })
    }
}

#[pymethods]
impl PyAssemblyEnv {
    /// Create an environment of `count` scattered assets.
    #[staticmethod]
    #[pyo3(signature = (count, seed=0, config=None))]
    fn scatter(count: usize, seed: u64, config: Option<&str>) -> PyResult<Self> {
        Self::build(&ScatterLayout::new(count, seed), parse_config(config)?)
    }

    /// Create an environment from a JSON scene file.
    #[staticmethod]
    #[pyo3(signature = (path, config=None))]
    fn from_scene(path: &str, config: Option<&str>) -> PyResult<Self> {
        let scene = SceneDescription::from_path(path).map_err(to_py_err)?;
        Self::build(&scene, parse_config(config)?)
    }

    /// Reset the episode and return the first observation.
    ///
    /// Resets mid-assembly keep the bound structure and only return the
    /// active asset to its initial pose.
    fn reset<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyArray1<f32>>> {
        let observation = self.inner.reset().map_err(to_py_err)?;
        Ok(observation.values().to_pyarray(py))
    }

    /// Apply a six-value action for `dt` seconds.
    ///
    /// Returns `(observation, reward, done, truncated)`.
    ///
    /// Releases the GIL during computation for better Python threading.
    #[pyo3(signature = (action, dt=0.02))]
    fn step<'py>(
        &mut self,
        py: Python<'py>,
        action: Vec<f32>,
        dt: f32,
    ) -> PyResult<(Bound<'py, PyArray1<f32>>, f32, bool, bool)> {
        let action = Action::from_slice(&action).map_err(to_py_err)?;
        let outcome = py
            .allow_threads(|| self.inner.step(&action, dt))
            .map_err(to_py_err)?;
        Ok((
            outcome.observation.values().to_pyarray(py),
            outcome.reward,
            outcome.done,
            outcome.truncated,
        ))
    }

    /// Manual-control action from two input axes.
    #[pyo3(signature = (horizontal, vertical, dt=0.02))]
    fn heuristic(&self, horizontal: f32, vertical: f32, dt: f32) -> Vec<f32> {
        Action::heuristic(horizontal, vertical, self.inner.config().move_speed, dt)
            .to_array()
            .to_vec()
    }

    /// The active asset started touching another body.
    fn collision_enter(&mut self) {
        self.inner.on_collision_enter();
    }

    /// The active asset stopped touching another body.
    fn collision_exit(&mut self) {
        self.inner.on_collision_exit();
    }

    /// The active asset entered the failure trigger volume.
    fn trigger_enter(&mut self) {
        self.inner.on_trigger_enter();
    }

    /// Length of every observation.
    #[getter]
    fn observation_size(&self) -> usize {
        self.inner.observation_size()
    }

    /// Number of values in an action.
    #[getter]
    fn action_size(&self) -> usize {
        joinery_core::ACTION_SIZE
    }

    /// Processing index of the active asset.
    #[getter]
    fn current_index(&self) -> usize {
        self.inner.current().index()
    }

    /// Number of assets in the scene.
    #[getter]
    fn asset_count(&self) -> usize {
        self.inner.assets().len()
    }

    /// Current episode phase.
    #[getter]
    fn phase(&self) -> Phase {
        self.inner.phase().into()
    }

    /// Total reward of the episode so far.
    #[getter]
    fn cumulative_reward(&self) -> f32 {
        self.inner.state().cumulative_reward()
    }

    /// Reward the previous episode earned after its last step, e.g. a trigger
    /// penalty followed directly by `reset()`.
    #[getter]
    fn unreported_reward(&self) -> f32 {
        self.inner.state().unreported_reward()
    }

    /// Names of the bound assets in bind order.
    fn bound_assets(&self) -> Vec<String> {
        self.inner
            .graph()
            .members()
            .iter()
            .filter_map(|id| self.inner.assets().get(*id))
            .map(|asset| asset.name().to_string())
            .collect()
    }

    /// Files written by the structure exporter.
    fn exported_files(&self) -> Vec<String> {
        self.inner
            .feedback()
            .written()
            .iter()
            .map(|path| path.display().to_string())
            .collect()
    }

    /// Deterministic hash of the environment state.
    fn state_hash(&self) -> u64 {
        self.inner.state_hash()
    }

    fn __repr__(&self) -> String {
        format!(
            "AssemblyEnv(assets={}, current={}, phase={:?})",
            self.inner.assets().len(),
            self.inner.current().index(),
            self.inner.phase()
        )
    }
}

/// Default export settings as JSON, for building config strings in Python.
#[pyfunction]
fn default_export_config() -> PyResult<String> {
    serde_json::to_string(&ExportConfig::default())
        .map_err(|err| PyValueError::new_err(err.to_string()))
}

#[pymodule]
fn _joinery(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyAssemblyEnv>()?;
    m.add_class::<Phase>()?;
    m.add_function(wrap_pyfunction!(default_export_config, m)?)?;
    m.add("ACTION_SIZE", joinery_core::ACTION_SIZE)?;
    Ok(())
}
