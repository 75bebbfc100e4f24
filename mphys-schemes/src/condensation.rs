//! Bulk condensation of supersaturated vapour onto cloud
//!
//! The simplest member of the scheme family: any vapour in excess of saturation is moved to
//! cloud liquid in one step.
//! Only the vapour and cloud mixing ratios are touched.
//! Temperature is not updated for the latent heat released.

use mphys_core::errors::MPhysResult;
use mphys_core::formulae::relative_humidity;
use mphys_core::scheme::{check_timestep, MicrophysicsScheme};
use mphys_core::thermo::{MoistureCategory, ThermodynamicState};
use mphys_core::{FloatValue, Timestep};

/// Pure condensation scheme.
///
/// For each cell
///
/// $$ \Delta q = \max\left(0, q_v \left(1 - \frac{1}{RH}\right)\right) $$
///
/// is moved from vapour to cloud.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkCondensationScheme;

impl BulkCondensationScheme {
    pub fn new() -> Self {
        Self
    }

    /// Mass of vapour condensed in a cell.
    ///
    /// Fails with [`mphys_core::errors::MPhysError::Domain`] if the saturation vapour pressure
    /// is degenerate at `temp`.
    pub fn condensed(
        temp: FloatValue,
        press: FloatValue,
        qvap: FloatValue,
    ) -> MPhysResult<FloatValue> {
        let relh = relative_humidity(temp, press, qvap)?;
        if qvap <= 0.0 {
            // relh is zero as well
            return Ok(0.0);
        }
        Ok((qvap * (1.0 - 1.0 / relh)).max(0.0))
    }
}

impl MicrophysicsScheme for BulkCondensationScheme {
    fn name(&self) -> &str {
        "BulkCondensationScheme"
    }

    fn run(
        &mut self,
        timestep: Timestep,
        mut state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        check_timestep(timestep)?;
        state.check_physical()?;

        for index in 0..state.ncells() {
            let mut cell = state.cell(index);
            let dq = Self::condensed(
                cell.temperature,
                cell.pressure,
                cell.q(MoistureCategory::Vapour),
            )?;
            *cell.q_mut(MoistureCategory::Vapour) -= dq;
            *cell.q_mut(MoistureCategory::Cloud) += dq;
            state.set_cell(index, &cell);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use mphys_core::constants::EPSILON;
    use mphys_core::errors::MPhysError;
    use mphys_core::formulae::saturation_vapour_pressure;
    use mphys_core::thermo::MixingRatios;
    use ndarray::array;

    fn saturation_mixing_ratio(temp: FloatValue, press: FloatValue) -> FloatValue {
        let pvs = saturation_vapour_pressure(temp);
        EPSILON * pvs / (press - pvs)
    }

    #[test]
    fn subsaturated_parcel_is_unchanged() {
        let qsat = saturation_mixing_ratio(288.15, 101325.0);
        let state =
            ThermodynamicState::parcel(288.15, 1.225, 101325.0, [0.5 * qsat, 0.0, 0.0, 0.0, 0.0, 0.0])
                .unwrap();
        let result = BulkCondensationScheme.run(1.0, state.clone()).unwrap();
        assert_eq!(result, state);
    }

    #[test]
    fn supersaturated_parcel_condenses() {
        let qsat = saturation_mixing_ratio(288.15, 101325.0);
        let qvap = 1.1 * qsat;
        let state = ThermodynamicState::parcel(
            288.15,
            1.225,
            101325.0,
            [qvap, 0.0001, 0.0002, 0.0003, 0.0004, 0.0005],
        )
        .unwrap();

        let result = BulkCondensationScheme.run(1.0, state.clone()).unwrap();
        let q = result.mixing_ratios().cell(0);

        // total water is conserved and vapour moves towards saturation
        assert!(is_close!(q[0] + q[1], qvap + 0.0001));
        assert!(q[0] < qvap);
        assert!(q[0] > qsat);
        assert_eq!(&q[2..], &[0.0002, 0.0003, 0.0004, 0.0005]);
        assert_eq!(result.temperature(), state.temperature());
    }

    #[test]
    fn dry_cells_are_skipped() {
        let state = ThermodynamicState::new(
            array![280.0, 280.0],
            array![1.0, 1.0],
            array![90000.0, 90000.0],
            MixingRatios::from_array([
                array![0.0, 0.05],
                array![0.0, 0.0],
                array![0.0, 0.0],
                array![0.0, 0.0],
                array![0.0, 0.0],
                array![0.0, 0.0],
            ])
            .unwrap(),
        )
        .unwrap();

        let result = BulkCondensationScheme.run(1.0, state).unwrap();
        let qcond = &result.mixing_ratios()[MoistureCategory::Cloud];
        assert_eq!(qcond[0], 0.0);
        assert!(qcond[1] > 0.0);
    }

    #[test]
    fn degenerate_saturation_pressure_is_a_domain_error() {
        // T - T0 == -C makes the Magnus denominator vanish
        let state =
            ThermodynamicState::parcel(273.15 - 243.04, 1.0, 90000.0, [0.01, 0.0, 0.0, 0.0, 0.0, 0.0])
                .unwrap();
        let err = BulkCondensationScheme.run(1.0, state).unwrap_err();
        assert!(matches!(err, MPhysError::Domain(_)));
    }

    #[test]
    fn non_positive_pressure_is_a_domain_error() {
        let state =
            ThermodynamicState::parcel(280.0, 1.0, 0.0, [0.01, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(matches!(
            BulkCondensationScheme.run(1.0, state),
            Err(MPhysError::Domain(_))
        ));
    }
}
