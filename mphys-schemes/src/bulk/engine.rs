//! The contract between a one-moment scheme and its engine

use mphys_core::errors::MPhysResult;
use mphys_core::scheme::GridSpec;
use mphys_core::thermo::ThermodynamicState;
use mphys_core::{FloatValue, Timestep};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Precipitation diagnostics of one engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    /// Mean surface precipitation rate over the step, one value per column
    /// unit: kg / m^2 / s
    pub rate: Array1<FloatValue>,
    /// Mean downward precipitation flux at the bottom of each cell
    /// unit: kg / m^2 / s
    pub flux: Array1<FloatValue>,
}

impl Precipitation {
    /// No precipitation on `grid`.
    pub fn zeros(grid: &GridSpec) -> Self {
        Self {
            rate: Array1::zeros(grid.nvec),
            flux: Array1::zeros(grid.ncells()),
        }
    }

    /// Total surface precipitation rate summed over columns.
    pub fn total_rate(&self) -> FloatValue {
        self.rate.sum()
    }
}

/// Bulk transformation engine used by [`super::OneMomentScheme`].
///
/// The scheme guarantees that `start` is called once before any `transform` and `stop`
/// once after the last, and that `state` always matches `grid`.
pub trait BulkEngine: Debug {
    /// Process-wide name of the engine.
    ///
    /// Only one engine with a given name may be started at a time.
    fn name(&self) -> &str;

    fn start(&mut self, _grid: &GridSpec) -> MPhysResult<()> {
        Ok(())
    }

    /// Transform the moisture categories of `state` in place over one timestep.
    fn transform(
        &mut self,
        grid: &GridSpec,
        timestep: Timestep,
        state: &mut ThermodynamicState,
    ) -> MPhysResult<Precipitation>;

    fn stop(&mut self) -> MPhysResult<()> {
        Ok(())
    }
}
