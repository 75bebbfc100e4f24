//! Native Kessler-type warm-rain engine
//!
//! # What This Engine Does
//!
//! Per cell, in this order:
//!
//! 1. Autoconversion of cloud to rain above a threshold mixing ratio
//! 2. Accretion of cloud by rain
//! 3. Evaporation of rain in subsaturated air, cooling the cell
//!
//! Then per column:
//!
//! 4. Sedimentation of rain with a mass-weighted terminal velocity, sub-stepped to keep the
//!    fall Courant number below a limit. Rain leaving the bottom level is surface precipitation.
//!
//! Vapour excess is left for the saturation adjustment that brackets the engine, and the
//! frozen categories are passed through untouched.

use super::engine::{BulkEngine, Precipitation};
use crate::parameters::WarmRainParameters;
use crate::saturation_adjustment::heat_capacity;
use mphys_core::constants::LATENT_HEAT_VAP;
use mphys_core::errors::{MPhysError, MPhysResult};
use mphys_core::formulae::saturation_specific_humidity_rho;
use mphys_core::scheme::GridSpec;
use mphys_core::thermo::MoistureCategory::{Cloud, Rain, Vapour};
use mphys_core::thermo::{CellState, ThermodynamicState};
use mphys_core::{FloatValue, Timestep};
use ndarray::Array1;
use tracing::debug;

// Klemp and Wilhelmson (1978) rain evaporation, in cgs units
const EVAPORATION_VENTILATION: FloatValue = 1.6;
const EVAPORATION_VENTILATION_SCALE: FloatValue = 124.9;
const EVAPORATION_VENTILATION_EXPONENT: FloatValue = 0.2046;
const EVAPORATION_EXPONENT: FloatValue = 0.525;
const EVAPORATION_DIFFUSION: FloatValue = 5.4e5;
const EVAPORATION_CONDUCTION: FloatValue = 2.55e6;

/// kg/m^3 to g/cm^3
const DENSITY_TO_CGS: FloatValue = 1e-3;
/// Pa to mbar
const PRESSURE_TO_MBAR: FloatValue = 1e-2;

/// Warm one-moment bulk engine.
#[derive(Debug, Clone, Default)]
pub struct WarmRainEngine {
    parameters: WarmRainParameters,
}

impl WarmRainEngine {
    pub fn new() -> Self {
        Self::from_parameters(WarmRainParameters::default())
    }

    pub fn from_parameters(parameters: WarmRainParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &WarmRainParameters {
        &self.parameters
    }

    /// Rate of cloud to rain conversion by autoconversion and accretion
    ///
    /// unit: 1/s
    pub fn collection_rate(&self, qcond: FloatValue, qrain: FloatValue) -> FloatValue {
        let p = &self.parameters;
        let qcond = qcond.max(0.0);
        let autoconversion = p.autoconversion_rate * (qcond - p.autoconversion_threshold).max(0.0);
        let accretion = p.accretion_coefficient * qcond * qrain.max(0.0).powf(p.accretion_exponent);
        autoconversion + accretion
    }

    /// Rain evaporation rate in air with saturation mixing ratio `qsat`
    ///
    /// Zero in saturated air.
    ///
    /// unit: 1/s
    pub fn evaporation_rate(&self, cell: &CellState, qsat: FloatValue) -> FloatValue {
        let subsaturation = 1.0 - cell.q(Vapour) / qsat;
        let qrain = cell.q(Rain);
        if subsaturation <= 0.0 || qrain <= 0.0 {
            return 0.0;
        }

        let rho = cell.density * DENSITY_TO_CGS;
        let rain_density = rho * qrain;
        let ventilation = EVAPORATION_VENTILATION
            + EVAPORATION_VENTILATION_SCALE * rain_density.powf(EVAPORATION_VENTILATION_EXPONENT);
        let resistance = EVAPORATION_DIFFUSION
            + EVAPORATION_CONDUCTION / (cell.pressure * PRESSURE_TO_MBAR * qsat);

        subsaturation * ventilation * rain_density.powf(EVAPORATION_EXPONENT) / (rho * resistance)
    }

    /// Mass-weighted terminal velocity of rain
    ///
    /// unit: m/s
    pub fn terminal_velocity(&self, density: FloatValue, qrain: FloatValue) -> FloatValue {
        if qrain <= 0.0 {
            return 0.0;
        }
        let p = &self.parameters;
        p.terminal_velocity_coefficient
            * (DENSITY_TO_CGS * density * qrain).powf(p.terminal_velocity_exponent)
            * (p.reference_density / density).sqrt()
    }

    fn convert(&self, timestep: Timestep, cell: &mut CellState) -> MPhysResult<()> {
        let collected = (self.collection_rate(cell.q(Cloud), cell.q(Rain)) * timestep)
            .min(cell.q(Cloud).max(0.0));
        *cell.q_mut(Cloud) -= collected;
        *cell.q_mut(Rain) += collected;

        let qsat = saturation_specific_humidity_rho(cell.temperature, cell.density)?;
        let deficit = (qsat - cell.q(Vapour)).max(0.0);
        let evaporated = (self.evaporation_rate(cell, qsat) * timestep)
            .min(cell.q(Rain).max(0.0))
            .min(deficit);
        if evaporated > 0.0 {
            let cooling = LATENT_HEAT_VAP / heat_capacity(cell) * evaporated;
            *cell.q_mut(Rain) -= evaporated;
            *cell.q_mut(Vapour) += evaporated;
            cell.temperature -= cooling;
        }
        Ok(())
    }

    /// Let rain fall through one column over `timestep`.
    ///
    /// `cells` are the state indices of the column, bottom first.
    /// Returns the mean surface rate and writes the mean flux out of the bottom of each cell
    /// into `flux`.
    fn sediment(
        &self,
        grid: &GridSpec,
        timestep: Timestep,
        state: &mut ThermodynamicState,
        cells: &[usize],
        flux: &mut Array1<FloatValue>,
    ) -> MPhysResult<FloatValue> {
        let density: Vec<FloatValue> = cells.iter().map(|&i| state.density()[i]).collect();
        let dz: Vec<FloatValue> = cells.iter().map(|&i| grid.dz[i]).collect();
        let mut qrain: Vec<FloatValue> = cells
            .iter()
            .map(|&i| state.mixing_ratios()[Rain][i])
            .collect();

        let mut elapsed = 0.0;
        let mut surface = 0.0;
        let mut substeps = 0;
        while elapsed < timestep {
            let fall: Vec<FloatValue> = density
                .iter()
                .zip(&qrain)
                .map(|(rho, q)| self.terminal_velocity(*rho, *q))
                .collect();
            let limit = fall
                .iter()
                .zip(&dz)
                .filter(|(v, _)| **v > 0.0)
                .map(|(v, dz)| self.parameters.max_sedimentation_courant * dz / v)
                .fold(FloatValue::INFINITY, FloatValue::min);
            let dt = limit.min(timestep - elapsed);
            if !(dt > 0.0) {
                return Err(MPhysError::engine(
                    self.name(),
                    format!("sedimentation stalled at {elapsed} s of {timestep} s"),
                ));
            }

            // Downward mass flux out of the bottom of each cell
            let out: Vec<FloatValue> = (0..cells.len())
                .map(|k| density[k] * qrain[k].max(0.0) * fall[k])
                .collect();
            for k in 0..cells.len() {
                let inflow = out.get(k + 1).copied().unwrap_or(0.0);
                qrain[k] += dt * (inflow - out[k]) / (density[k] * dz[k]);
                flux[cells[k]] += out[k] * dt / timestep;
            }
            surface += out[0] * dt / timestep;

            elapsed += dt;
            substeps += 1;
        }

        let mut rain = state.mixing_ratios_mut().view_mut(Rain);
        for (k, &i) in cells.iter().enumerate() {
            rain[i] = qrain[k];
        }
        debug!(substeps, surface, "rain sedimentation");
        Ok(surface)
    }
}

impl BulkEngine for WarmRainEngine {
    fn name(&self) -> &str {
        "warm-rain"
    }

    fn transform(
        &mut self,
        grid: &GridSpec,
        timestep: Timestep,
        state: &mut ThermodynamicState,
    ) -> MPhysResult<Precipitation> {
        grid.check_state(state)?;
        let mut precipitation = Precipitation::zeros(grid);

        for ivec in grid.ivstart..grid.nvec {
            let cells: Vec<usize> = (0..grid.nlevels).map(|k| grid.cell_index(ivec, k)).collect();
            for &index in &cells {
                let mut cell = state.cell(index);
                self.convert(timestep, &mut cell)?;
                state.set_cell(index, &cell);
            }
            precipitation.rate[ivec] =
                self.sediment(grid, timestep, state, &cells, &mut precipitation.flux)?;
        }
        Ok(precipitation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mphys_core::thermo::MixingRatios;

    fn column(nlevels: usize, qcond: FloatValue, qrain: FloatValue) -> ThermodynamicState {
        let mut q = MixingRatios::zeros(nlevels);
        q.view_mut(Cloud).fill(qcond);
        q.view_mut(Rain).fill(qrain);
        // saturated vapour so that nothing evaporates
        let qsat = saturation_specific_humidity_rho(285.0, 1.0).unwrap();
        q.view_mut(Vapour).fill(qsat);
        ThermodynamicState::new(
            Array1::from_elem(nlevels, 285.0),
            Array1::from_elem(nlevels, 1.0),
            Array1::from_elem(nlevels, 85000.0),
            q,
        )
        .unwrap()
    }

    fn rain_mass(state: &ThermodynamicState, grid: &GridSpec) -> FloatValue {
        (0..state.ncells())
            .map(|i| state.density()[i] * state.mixing_ratios()[Rain][i] * grid.dz[i])
            .sum()
    }

    #[test]
    fn no_autoconversion_below_threshold() {
        let engine = WarmRainEngine::new();
        assert_eq!(engine.collection_rate(0.0009, 0.0), 0.0);
        assert_relative_eq!(engine.collection_rate(0.002, 0.0), 1e-6);
        assert!(engine.collection_rate(0.0009, 0.001) > 0.0);
    }

    #[test]
    fn no_evaporation_in_saturated_air() {
        let engine = WarmRainEngine::new();
        let state = column(1, 0.0, 0.001);
        let cell = state.cell(0);
        let qsat = saturation_specific_humidity_rho(cell.temperature, cell.density).unwrap();
        assert_eq!(engine.evaporation_rate(&cell, qsat), 0.0);
    }

    #[test]
    fn rain_evaporates_and_cools_in_dry_air() {
        let grid = GridSpec::parcel(100.0, 1e8).unwrap();
        let mut state = column(1, 0.0, 0.001);
        state.mixing_ratios_mut().view_mut(Vapour).fill(0.002);
        let before = state.cell(0);

        let mut engine = WarmRainEngine::new();
        engine.transform(&grid, 1.0, &mut state).unwrap();
        let after = state.cell(0);

        assert!(after.q(Vapour) > before.q(Vapour));
        assert!(after.temperature < before.temperature);
    }

    #[test]
    fn rain_mass_is_conserved_by_sedimentation() {
        let grid = GridSpec::column(20, 50.0, 1e8).unwrap();
        let mut state = column(20, 0.0, 0.0);
        {
            let mut rain = state.mixing_ratios_mut().view_mut(Rain);
            for k in 10..15 {
                rain[k] = 0.002;
            }
        }
        let before = rain_mass(&state, &grid);

        let mut engine = WarmRainEngine::new();
        let timestep = 30.0;
        let precipitation = engine.transform(&grid, timestep, &mut state).unwrap();

        let after = rain_mass(&state, &grid);
        assert_relative_eq!(
            after + precipitation.rate[0] * timestep,
            before,
            max_relative = 1e-12
        );
        // rain has moved down
        assert!(state.mixing_ratios()[Rain][9] > 0.0);
        assert!(state.mixing_ratios()[Rain][14] < 0.002);
        assert!(state.mixing_ratios().cell(0)[Rain as usize] >= 0.0);
    }

    #[test]
    fn surface_precipitation_from_lowest_level() {
        let grid = GridSpec::column(5, 20.0, 1e8).unwrap();
        let mut state = column(5, 0.0, 0.001);

        let mut engine = WarmRainEngine::new();
        let precipitation = engine.transform(&grid, 5.0, &mut state).unwrap();

        assert!(precipitation.rate[0] > 0.0);
        assert!(precipitation.flux.iter().all(|f| *f > 0.0));
        assert_relative_eq!(precipitation.rate[0], precipitation.flux[0]);
        assert!(state.mixing_ratios().unpack()[Rain as usize]
            .iter()
            .all(|q| *q >= 0.0));
    }

    #[test]
    fn columns_before_ivstart_are_untouched() {
        let grid = GridSpec::new(2, 3, 1, Array1::from_elem(6, 50.0), Array1::from_elem(2, 1e8))
            .unwrap();
        let mut state = column(6, 0.003, 0.001);
        let before = state.clone();

        WarmRainEngine::new().transform(&grid, 10.0, &mut state).unwrap();

        for i in 0..3 {
            assert_eq!(state.cell(i), before.cell(i));
        }
        assert!(state.mixing_ratios()[Cloud][3] < 0.003);
    }

    #[test]
    fn collection_cannot_exceed_available_cloud() {
        let grid = GridSpec::parcel(1000.0, 1e8).unwrap();
        let mut state = column(1, 0.002, 0.01);

        WarmRainEngine::new()
            .transform(&grid, 1000.0, &mut state)
            .unwrap();
        assert_eq!(state.mixing_ratios()[Cloud][0], 0.0);
    }
}
