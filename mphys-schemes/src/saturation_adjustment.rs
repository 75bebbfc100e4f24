//! Saturation adjustment at constant density
//!
//! Vapour and cloud liquid are brought into equilibrium in every cell while conserving the
//! internal energy of the cell.
//! Cells that remain subsaturated after evaporating all of their cloud end with no cloud.
//! Otherwise the adjusted temperature $T$ is the root of
//!
//! $$ c_v (T - T_i) = L_v \left( q_t - q_{sat}(T, \rho) - q_{c,i} \right) $$
//!
//! where $q_t = q_v + q_c$ and the subscript $i$ marks the incoming values.
//! The root is found by Newton iteration.
//!
//! The heat capacity $c_v$ is held fixed for the adjustment, counting cloud liquid at the heat
//! capacity of vapour so that it does not change as mass moves between the two.
//! Rain and the frozen categories only contribute to $c_v$.

use crate::parameters::SaturationAdjustmentParameters;
use mphys_core::constants::{CV_DRY, CV_VAP, C_ICE, C_LIQ, LATENT_HEAT_VAP};
use mphys_core::errors::{MPhysError, MPhysResult};
use mphys_core::formulae::{dqsat_dtemp_rho, saturation_specific_humidity_rho};
use mphys_core::scheme::{check_timestep, MicrophysicsScheme};
use mphys_core::thermo::{CellState, ThermodynamicState};
use mphys_core::{FloatValue, Timestep};

use mphys_core::thermo::MoistureCategory::{Cloud, Graupel, Ice, Rain, Snow, Vapour};

/// Heat capacity at constant volume of a cell per unit mass of dry air
/// unit: J / kg / K
pub fn heat_capacity(cell: &CellState) -> FloatValue {
    let qtot = cell.q(Vapour) + cell.q(Cloud);
    let qfrozen = cell.q(Ice) + cell.q(Snow) + cell.q(Graupel);
    CV_DRY + CV_VAP * qtot + C_LIQ * cell.q(Rain) + C_ICE * qfrozen
}

/// Supersaturation of a cell with respect to liquid at constant density.
pub fn supersaturation_rho(cell: &CellState) -> MPhysResult<FloatValue> {
    let qsat = saturation_specific_humidity_rho(cell.temperature, cell.density)?;
    Ok(cell.q(Vapour) / qsat - 1.0)
}

/// The saturation adjustment routine.
#[derive(Debug, Clone, Default)]
pub struct SaturationAdjustment {
    parameters: SaturationAdjustmentParameters,
}

impl SaturationAdjustment {
    pub fn new() -> Self {
        Self::from_parameters(SaturationAdjustmentParameters::default())
    }

    pub fn from_parameters(parameters: SaturationAdjustmentParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &SaturationAdjustmentParameters {
        &self.parameters
    }

    /// Adjust a single cell in place.
    ///
    /// Fails with [`MPhysError::Domain`] if the temperature or density of the cell is not
    /// physical, if the saturation pressure is degenerate anywhere along the iteration, or if
    /// the iteration does not converge.
    pub fn adjust_cell(&self, cell: &mut CellState) -> MPhysResult<()> {
        let temp_init = cell.temperature;
        let rho = cell.density;
        if !(temp_init.is_finite() && temp_init > 0.0) {
            return Err(MPhysError::Domain(format!(
                "temperature must be positive, got {temp_init} K"
            )));
        }

        let qcond_init = cell.q(Cloud);
        let qtot = cell.q(Vapour) + qcond_init;
        let lv_cv = LATENT_HEAT_VAP / heat_capacity(cell);

        // Evaporate all of the cloud and check whether the air can hold it
        let temp_dry = temp_init - lv_cv * qcond_init;
        if qtot <= saturation_specific_humidity_rho(temp_dry, rho)? {
            *cell.q_mut(Vapour) = qtot;
            *cell.q_mut(Cloud) = 0.0;
            cell.temperature = temp_dry;
            return Ok(());
        }

        let mut temp = temp_init;
        for _ in 0..self.parameters.max_iterations {
            let qsat = saturation_specific_humidity_rho(temp, rho)?;
            let residual = temp - temp_init - lv_cv * (qtot - qsat - qcond_init);
            let slope = 1.0 + lv_cv * dqsat_dtemp_rho(qsat, temp);
            let delta = -residual / slope;
            temp += delta;

            if delta.abs() < self.parameters.tolerance {
                let qsat = saturation_specific_humidity_rho(temp, rho)?;
                *cell.q_mut(Vapour) = qsat;
                *cell.q_mut(Cloud) = qtot - qsat;
                cell.temperature = temp;
                return Ok(());
            }
        }

        Err(MPhysError::Domain(format!(
            "saturation adjustment did not converge within {} iterations from T={temp_init} K",
            self.parameters.max_iterations
        )))
    }

    /// Adjust every cell of `state` in place.
    ///
    /// On error the state may be partially adjusted and should be discarded.
    pub fn apply(&self, state: &mut ThermodynamicState) -> MPhysResult<()> {
        state.check_physical()?;
        for index in 0..state.ncells() {
            let mut cell = state.cell(index);
            self.adjust_cell(&mut cell)?;
            state.set_cell(index, &cell);
        }
        Ok(())
    }
}

/// Scheme consisting of a single saturation adjustment pass per timestep.
#[derive(Debug, Clone, Default)]
pub struct SaturationAdjustmentScheme {
    adjustment: SaturationAdjustment,
}

impl SaturationAdjustmentScheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parameters(parameters: SaturationAdjustmentParameters) -> Self {
        Self {
            adjustment: SaturationAdjustment::from_parameters(parameters),
        }
    }

    pub fn adjustment(&self) -> &SaturationAdjustment {
        &self.adjustment
    }
}

impl MicrophysicsScheme for SaturationAdjustmentScheme {
    fn name(&self) -> &str {
        "SaturationAdjustmentScheme"
    }

    fn run(
        &mut self,
        timestep: Timestep,
        mut state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        check_timestep(timestep)?;
        self.adjustment.apply(&mut state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mphys_core::thermo::MixingRatios;
    use ndarray::array;

    fn cell(temperature: FloatValue, qvap: FloatValue, qcond: FloatValue) -> CellState {
        CellState {
            temperature,
            density: 1.0,
            pressure: 85000.0,
            mixing_ratios: [qvap, qcond, 0.0, 0.0, 0.0, 0.0],
        }
    }

    fn internal_energy(cell: &CellState) -> FloatValue {
        heat_capacity(cell) * cell.temperature - LATENT_HEAT_VAP * cell.q(Cloud)
    }

    #[test]
    fn supersaturated_cell_condenses_and_warms() {
        let qsat = saturation_specific_humidity_rho(285.0, 1.0).unwrap();
        let before = cell(285.0, 1.2 * qsat, 0.0);
        let mut after = before;

        SaturationAdjustment::new().adjust_cell(&mut after).unwrap();

        assert!(after.q(Cloud) > 0.0);
        assert!(after.temperature > before.temperature);
        assert_relative_eq!(after.q(Vapour) + after.q(Cloud), 1.2 * qsat, max_relative = 1e-12);
        assert_relative_eq!(supersaturation_rho(&after).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(internal_energy(&after), internal_energy(&before), max_relative = 1e-9);
    }

    #[test]
    fn subsaturated_cell_evaporates_all_cloud() {
        let qsat = saturation_specific_humidity_rho(290.0, 1.0).unwrap();
        let before = cell(290.0, 0.5 * qsat, 0.0005);
        let mut after = before;

        SaturationAdjustment::new().adjust_cell(&mut after).unwrap();

        assert_eq!(after.q(Cloud), 0.0);
        assert_relative_eq!(after.q(Vapour), 0.5 * qsat + 0.0005);
        assert!(after.temperature < before.temperature);
        assert_relative_eq!(internal_energy(&after), internal_energy(&before), max_relative = 1e-12);
    }

    #[test]
    fn partial_evaporation_to_saturation() {
        let qsat = saturation_specific_humidity_rho(280.0, 1.0).unwrap();
        let mut after = cell(280.0, 0.95 * qsat, 0.002);

        SaturationAdjustment::new().adjust_cell(&mut after).unwrap();

        assert!(after.q(Cloud) > 0.0);
        assert!(after.q(Cloud) < 0.002);
        assert_relative_eq!(supersaturation_rho(&after).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn adjustment_is_idempotent() {
        let adjustment = SaturationAdjustment::new();
        let qsat = saturation_specific_humidity_rho(285.0, 1.0).unwrap();
        for (qvap, qcond) in [(1.3 * qsat, 0.0), (0.8 * qsat, 0.001), (0.2 * qsat, 0.0)] {
            let mut once = cell(285.0, qvap, qcond);
            adjustment.adjust_cell(&mut once).unwrap();
            let mut twice = once;
            adjustment.adjust_cell(&mut twice).unwrap();

            assert_relative_eq!(twice.temperature, once.temperature, max_relative = 1e-12);
            assert_relative_eq!(twice.q(Vapour), once.q(Vapour), max_relative = 1e-10);
            assert_relative_eq!(twice.q(Cloud), once.q(Cloud), epsilon = 1e-14);
        }
    }

    #[test]
    fn other_categories_are_untouched() {
        let qsat = saturation_specific_humidity_rho(285.0, 1.0).unwrap();
        let mut after = cell(285.0, 1.1 * qsat, 0.0);
        after.mixing_ratios[2..].copy_from_slice(&[1e-4, 2e-4, 3e-4, 4e-4]);

        SaturationAdjustment::new().adjust_cell(&mut after).unwrap();
        assert_eq!(&after.mixing_ratios[2..], &[1e-4, 2e-4, 3e-4, 4e-4]);
        assert_eq!(after.pressure, 85000.0);
        assert_eq!(after.density, 1.0);
    }

    #[test]
    fn invalid_cells_are_domain_errors() {
        let adjustment = SaturationAdjustment::new();
        for mut invalid in [
            cell(0.0, 0.01, 0.0),
            cell(f64::NAN, 0.01, 0.0),
            CellState {
                density: 0.0,
                ..cell(280.0, 0.01, 0.0)
            },
            // below the range of the saturation formula
            cell(30.0, 0.01, 0.0),
        ] {
            let err = adjustment.adjust_cell(&mut invalid).unwrap_err();
            assert!(matches!(err, MPhysError::Domain(_)));
        }
    }

    #[test]
    fn scheme_adjusts_every_cell() {
        let qsat = saturation_specific_humidity_rho(285.0, 1.0).unwrap();
        let state = ThermodynamicState::new(
            array![285.0, 285.0],
            array![1.0, 1.0],
            array![85000.0, 85000.0],
            MixingRatios::from_array([
                array![1.2 * qsat, 0.5 * qsat],
                array![0.0, 0.0],
                array![0.0, 0.0],
                array![0.0, 0.0],
                array![0.0, 0.0],
                array![0.0, 0.0],
            ])
            .unwrap(),
        )
        .unwrap();

        let mut scheme = SaturationAdjustmentScheme::new();
        let result = scheme.run(10.0, state).unwrap();
        let qcond = &result.mixing_ratios()[Cloud];
        assert!(qcond[0] > 0.0);
        assert_eq!(qcond[1], 0.0);

        assert!(scheme.run(0.0, result).is_err());
    }
}
