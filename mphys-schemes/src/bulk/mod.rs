//! One-moment bulk schemes
//!
//! A [`OneMomentScheme`] wraps a [`BulkEngine`] in the fixed saturation adjustment sandwich:
//! every timestep applies a saturation adjustment, the engine's bulk transformation and a
//! second saturation adjustment, in that order.
//! The engine is started in `initialize` and stopped in `finalize`, under an
//! [`EngineHandle`] so that only one instance of an engine is live in the process.

mod engine;
mod warm_rain;

pub use engine::{BulkEngine, Precipitation};
pub use warm_rain::WarmRainEngine;

use crate::parameters::SaturationAdjustmentParameters;
use crate::saturation_adjustment::SaturationAdjustment;
use mphys_core::engine::EngineHandle;
use mphys_core::errors::{MPhysError, MPhysResult};
use mphys_core::scheme::{check_timestep, GridSpec, MicrophysicsScheme};
use mphys_core::thermo::ThermodynamicState;
use mphys_core::Timestep;
use tracing::info;

/// Engine-backed one-moment bulk scheme.
#[derive(Debug)]
pub struct OneMomentScheme<E: BulkEngine> {
    engine: E,
    grid: GridSpec,
    adjustment: SaturationAdjustment,
    handle: Option<EngineHandle>,
    precipitation: Precipitation,
}

impl<E: BulkEngine> OneMomentScheme<E> {
    /// Create a scheme for states shaped like `grid`.
    ///
    /// The engine is not started until [`MicrophysicsScheme::initialize`].
    pub fn new(engine: E, grid: GridSpec) -> MPhysResult<Self> {
        grid.validate()?;
        let precipitation = Precipitation::zeros(&grid);
        Ok(Self {
            engine,
            grid,
            adjustment: SaturationAdjustment::new(),
            handle: None,
            precipitation,
        })
    }

    pub fn with_adjustment(mut self, parameters: SaturationAdjustmentParameters) -> Self {
        self.adjustment = SaturationAdjustment::from_parameters(parameters);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn adjustment(&self) -> &SaturationAdjustment {
        &self.adjustment
    }

    /// Whether the engine has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Precipitation diagnostics of the most recent step.
    pub fn precipitation(&self) -> &Precipitation {
        &self.precipitation
    }

    fn not_running(&self, operation: &str) -> MPhysError {
        MPhysError::engine(
            self.engine.name(),
            format!("cannot {operation}, the engine is not running"),
        )
    }
}

impl<E: BulkEngine> MicrophysicsScheme for OneMomentScheme<E> {
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
        // The handle is dropped, and the engine released, if start fails
        self.engine.start(&self.grid)?;
        self.handle = Some(handle);

        info!(
            engine = self.engine.name(),
            nvec = self.grid.nvec,
            nlevels = self.grid.nlevels,
            "one-moment scheme initialised"
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
        self.grid.check_state(&state)?;

        self.adjustment.apply(&mut state)?;
        self.precipitation = self.engine.transform(&self.grid, timestep, &mut state)?;
        self.adjustment.apply(&mut state)?;

        Ok(state)
    }

    fn finalize(&mut self) -> MPhysResult<()> {
        let handle = self.handle.take().ok_or_else(|| self.not_running("finalize"))?;
        let stopped = self.engine.stop();
        handle.release();
        stopped?;

        info!(
            engine = self.engine.name(),
            surface_precipitation = self.precipitation.total_rate(),
            "one-moment scheme finalised"
        );
        Ok(())
    }
}
