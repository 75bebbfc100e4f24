//! Coupling to a superdroplet engine
//!
//! A superdroplet engine tracks a population of computational droplets instead of bulk
//! category masses.
//! The scheme exchanges pressure, temperature, vapour and cloud with the engine once per
//! coupling timestep, along with the winds when the engine transports its droplets.
//! The other categories are passed through.

use mphys_core::engine::EngineHandle;
use mphys_core::errors::{MPhysError, MPhysResult};
use mphys_core::scheme::{check_timestep, GridSpec, MicrophysicsScheme};
use mphys_core::thermo::{MoistureCategory, ThermodynamicState, Winds};
use mphys_core::{FloatValue, Time, Timestep};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::info;

/// Relative tolerance when comparing the run timestep with the coupling timestep
const TIMESTEP_TOLERANCE: FloatValue = 1e-9;

/// Configuration of a superdroplet scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuperdropletConfig {
    /// Engine configuration file, read by the engine itself
    pub config_path: PathBuf,
    /// Timestep between exchanges with the engine
    /// unit: s
    pub coupling_timestep: Timestep,
    /// Model time of the first exchange
    /// unit: s
    pub t_start: Time,
    /// Whether the engine moves its droplets with the winds
    pub enable_motion: bool,
}

impl Default for SuperdropletConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("superdroplets.yaml"),
            coupling_timestep: 1.0,
            t_start: 0.0,
            enable_motion: false,
        }
    }
}

impl SuperdropletConfig {
    pub fn from_toml_str(contents: &str) -> MPhysResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| MPhysError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> MPhysResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MPhysError::Configuration(format!("could not read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> MPhysResult<()> {
        if !(self.coupling_timestep.is_finite() && self.coupling_timestep > 0.0) {
            return Err(MPhysError::Configuration(format!(
                "coupling timestep must be positive, got {}",
                self.coupling_timestep
            )));
        }
        if !self.t_start.is_finite() {
            return Err(MPhysError::Configuration(format!(
                "start time must be finite, got {}",
                self.t_start
            )));
        }
        Ok(())
    }
}

/// Fields exchanged with the engine on every coupling step.
///
/// The engine may update any of the four arrays in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CoupledFields {
    pub pressure: Array1<FloatValue>,
    pub temperature: Array1<FloatValue>,
    pub qvap: Array1<FloatValue>,
    pub qcond: Array1<FloatValue>,
}

impl CoupledFields {
    fn from_state(state: &ThermodynamicState) -> Self {
        Self {
            pressure: state.pressure().to_owned(),
            temperature: state.temperature().to_owned(),
            qvap: state.mixing_ratios()[MoistureCategory::Vapour].clone(),
            qcond: state.mixing_ratios()[MoistureCategory::Cloud].clone(),
        }
    }

    fn write_to(self, state: &mut ThermodynamicState) -> MPhysResult<()> {
        state.set_pressure(self.pressure)?;
        state.set_temperature(self.temperature)?;
        let q = state.mixing_ratios_mut();
        q.set(MoistureCategory::Vapour, self.qvap)?;
        q.set(MoistureCategory::Cloud, self.qcond)?;
        Ok(())
    }
}

/// Superdroplet engine driven by a [`SuperdropletScheme`].
pub trait SuperdropletEngine: Debug {
    /// Process-wide name of the engine.
    fn name(&self) -> &str;

    /// Start the engine, typically reading `config.config_path`.
    fn start(&mut self, _config: &SuperdropletConfig, _grid: &GridSpec) -> MPhysResult<()> {
        Ok(())
    }

    /// Advance the engine from `time` by one coupling timestep.
    ///
    /// `winds` is only provided when motion is enabled.
    fn step(
        &mut self,
        time: Time,
        timestep: Timestep,
        fields: &mut CoupledFields,
        winds: Option<&Winds>,
    ) -> MPhysResult<()>;

    fn stop(&mut self) -> MPhysResult<()> {
        Ok(())
    }
}

/// Scheme coupling the thermodynamic state to a superdroplet engine.
#[derive(Debug)]
pub struct SuperdropletScheme<E: SuperdropletEngine> {
    engine: E,
    config: SuperdropletConfig,
    grid: GridSpec,
    handle: Option<EngineHandle>,
    time: Time,
}

impl<E: SuperdropletEngine> SuperdropletScheme<E> {
    pub fn new(engine: E, config: SuperdropletConfig, grid: GridSpec) -> MPhysResult<Self> {
        config.validate()?;
        grid.validate()?;
        let time = config.t_start;
        Ok(Self {
            engine,
            config,
            grid,
            handle: None,
            time,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &SuperdropletConfig {
        &self.config
    }

    /// Model time of the next exchange with the engine.
    pub fn time(&self) -> Time {
        self.time
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    fn not_running(&self, operation: &str) -> MPhysError {
        MPhysError::engine(
            self.engine.name(),
            format!("cannot {operation}, the engine is not running"),
        )
    }

    fn check_coupling_timestep(&self, timestep: Timestep) -> MPhysResult<()> {
        let expected = self.config.coupling_timestep;
        if (timestep - expected).abs() > TIMESTEP_TOLERANCE * expected {
            return Err(MPhysError::Configuration(format!(
                "timestep {timestep} s differs from the coupling timestep {expected} s"
            )));
        }
        Ok(())
    }
}

impl<E: SuperdropletEngine> MicrophysicsScheme for SuperdropletScheme<E> {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn initialize(&mut self) -> MPhysResult<()> {
        if self.is_running() {
            return Err(MPhysError::engine(
                self.engine.name(),
                "scheme is already initialised",
            ));
        }
        let handle = EngineHandle::acquire(self.engine.name())?;
        self.engine.start(&self.config, &self.grid)?;
        self.handle = Some(handle);
        self.time = self.config.t_start;

        info!(
            engine = self.engine.name(),
            config = %self.config.config_path.display(),
            motion = self.config.enable_motion,
            "superdroplet scheme initialised"
        );
        Ok(())
    }

    fn run(
        &mut self,
        timestep: Timestep,
        mut state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        if !self.is_running() {
            return Err(self.not_running("run"));
        }
        check_timestep(timestep)?;
        self.check_coupling_timestep(timestep)?;
        self.grid.check_state(&state)?;

        let winds = if self.config.enable_motion {
            let winds = state.winds().ok_or_else(|| {
                MPhysError::Domain(
                    "superdroplet motion is enabled but the state has no winds".to_string(),
                )
            })?;
            Some(winds.clone())
        } else {
            None
        };

        let mut fields = CoupledFields::from_state(&state);
        self.engine
            .step(self.time, timestep, &mut fields, winds.as_ref())?;
        fields.write_to(&mut state)?;
        self.time += timestep;

        Ok(state)
    }

    fn finalize(&mut self) -> MPhysResult<()> {
        let handle = self.handle.take().ok_or_else(|| self.not_running("finalize"))?;
        let stopped = self.engine.stop();
        handle.release();
        stopped?;

        info!(engine = self.engine.name(), time = self.time, "superdroplet scheme finalised");
        Ok(())
    }
}
