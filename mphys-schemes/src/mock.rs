//! Scripted stand-in for an engine-backed bulk scheme
//!
//! The mock has the construction and call shape of a one-moment engine, but instead of
//! computing any physics it nudges every moisture category by a fixed amount on every 50th
//! call.
//! It is useful for checking that a driver passes the state through the scheme and records
//! what comes back.

use crate::bulk::Precipitation;
use mphys_core::errors::MPhysResult;
use mphys_core::scheme::{check_timestep, GridSpec, MicrophysicsScheme};
use mphys_core::thermo::{MoistureCategory, ThermodynamicState};
use mphys_core::{FloatValue, Timestep};
use tracing::debug;

/// Number of calls between perturbations
const PERTURBATION_INTERVAL: usize = 50;

/// Increment applied to each category on a perturbed call with an even call count
///
/// Order: [vapour, cloud, ice, rain, snow, graupel]
const PERTURBATION: [FloatValue; 6] = [0.001, -0.001, 0.002, -0.002, 0.0003, -0.0003];

/// Surface precipitation rate reported after every call
/// unit: kg / m^2 / s
const PRECIPITATION_RATE: FloatValue = 0.001;

/// Precipitation flux reported after every call
/// unit: kg / m^2 / s
const PRECIPITATION_FLUX: FloatValue = 0.01;

/// Mock one-moment scheme.
///
/// The first call and every 50th call after it add [`PERTURBATION`] to every cell, with the
/// sign flipped when the call count is odd.
/// No clipping is applied, so categories that start at zero can go negative.
#[derive(Debug, Clone)]
pub struct MockScheme {
    grid: GridSpec,
    ncalls: usize,
    precipitation: Precipitation,
}

impl MockScheme {
    pub fn new(grid: GridSpec) -> Self {
        let precipitation = Precipitation::zeros(&grid);
        Self {
            grid,
            ncalls: 0,
            precipitation,
        }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Number of completed `run` calls.
    pub fn ncalls(&self) -> usize {
        self.ncalls
    }

    /// Diagnostics of the most recent call.
    pub fn precipitation(&self) -> &Precipitation {
        &self.precipitation
    }

    fn increment(&self, category: MoistureCategory) -> FloatValue {
        let sign = if self.ncalls % 2 == 0 { 1.0 } else { -1.0 };
        sign * PERTURBATION[category as usize]
    }
}

impl MicrophysicsScheme for MockScheme {
    fn name(&self) -> &str {
        "MockScheme"
    }

    fn run(
        &mut self,
        timestep: Timestep,
        mut state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        check_timestep(timestep)?;
        self.grid.check_state(&state)?;

        if self.ncalls % PERTURBATION_INTERVAL == 0 {
            debug!(call = self.ncalls, "perturbing mixing ratios");
            for category in MoistureCategory::ALL {
                let increment = self.increment(category);
                state
                    .mixing_ratios_mut()
                    .view_mut(category)
                    .mapv_inplace(|q| q + increment);
            }
        }
        self.ncalls += 1;

        self.precipitation.rate.fill(PRECIPITATION_RATE);
        self.precipitation.flux.fill(PRECIPITATION_FLUX);

        Ok(state)
    }
}
