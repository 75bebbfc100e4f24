//! Adiabatic motion of a 0-D parcel forced by a sinusoidal pressure signal.

use crate::constants::{CP_DRY, EPSILON, RGAS_DRY};
use crate::dynamics::Dynamics;
use crate::errors::{MPhysError, MPhysResult};
use crate::thermo::{MoistureCategory, ThermodynamicState};
use crate::{FloatValue, Time, Timestep};
use ode_solvers::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// (pressure, temperature, density)
type ParcelState = Vector3<FloatValue>;

/// Parameters for [`SinusoidalParcelMotion`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelMotionParameters {
    /// Amplitude of the pressure oscillation
    /// unit: Pa
    pub amplitude: FloatValue,
    /// Period of the pressure oscillation
    /// unit: s
    pub period: FloatValue,
}

impl Default for ParcelMotionParameters {
    fn default() -> Self {
        Self {
            amplitude: 10000.0,
            period: 10.0,
        }
    }
}

/// A parcel rising and sinking adiabatically under a prescribed pressure forcing.
///
/// $$ \frac{dP}{dt} = -\omega A \cos(\omega t) $$
/// $$ \frac{dT}{dt} = \frac{1}{\rho c_{p,d}} \frac{dP}{dt} $$
/// $$ \frac{d\rho}{dt} = \frac{1}{R_{eff} T} \frac{dP}{dt} - \frac{\rho}{T} \frac{dT}{dt} $$
///
/// Where $\omega = 2\pi/\tau$ and $R_{eff} = R_d (1 + q_v/\epsilon)$.
/// The vapour mixing ratio is held fixed over each step.
///
/// Only single-cell states are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinusoidalParcelMotion {
    parameters: ParcelMotionParameters,
}

impl SinusoidalParcelMotion {
    pub fn new(amplitude: FloatValue, period: FloatValue) -> MPhysResult<Self> {
        Self::from_parameters(ParcelMotionParameters { amplitude, period })
    }

    pub fn from_parameters(parameters: ParcelMotionParameters) -> MPhysResult<Self> {
        if !(parameters.period.is_finite() && parameters.period > 0.0) {
            return Err(MPhysError::Configuration(format!(
                "period must be positive, got {}",
                parameters.period
            )));
        }
        if !parameters.amplitude.is_finite() {
            return Err(MPhysError::Configuration(format!(
                "amplitude must be finite, got {}",
                parameters.amplitude
            )));
        }
        Ok(Self { parameters })
    }

    pub fn parameters(&self) -> &ParcelMotionParameters {
        &self.parameters
    }

    /// Angular frequency (rad/s)
    pub fn omega(&self) -> FloatValue {
        2.0 * PI / self.parameters.period
    }

    pub fn dpress_dtime(&self, time: Time) -> FloatValue {
        let omega = self.omega();
        -omega * self.parameters.amplitude * (omega * time).cos()
    }

    pub fn dtemp_dtime(&self, dpress_dtime: FloatValue, rho: FloatValue) -> FloatValue {
        dpress_dtime / (rho * CP_DRY)
    }

    pub fn drho_dtime(
        &self,
        dpress_dtime: FloatValue,
        dtemp_dtime: FloatValue,
        temp: FloatValue,
        rho: FloatValue,
        qvap: FloatValue,
    ) -> FloatValue {
        let rgas_eff = RGAS_DRY * (1.0 + qvap / EPSILON);
        dpress_dtime / (rgas_eff * temp) - dtemp_dtime * rho / temp
    }

    /// RK4 step size for a step of `timestep`.
    ///
    /// The step is split into a power of two substeps so the integrator lands exactly on the
    /// end of the step, with at least 64 substeps per forcing period.
    fn substep(&self, timestep: Timestep) -> Timestep {
        let max_substep = self.parameters.period / 64.0;
        let mut h = timestep;
        while h > max_substep {
            h /= 2.0;
        }
        h
    }
}

/// The parcel ODEs over one step, in a local time coordinate starting at zero.
struct ParcelOdes<'a> {
    motion: &'a SinusoidalParcelMotion,
    t_start: Time,
    qvap: FloatValue,
}

impl System<Time, ParcelState> for ParcelOdes<'_> {
    fn system(&self, t: Time, y: &ParcelState, dy: &mut ParcelState) {
        let temp = y[1];
        let rho = y[2];

        let dpress = self.motion.dpress_dtime(self.t_start + t);
        let dtemp = self.motion.dtemp_dtime(dpress, rho);
        let drho = self.motion.drho_dtime(dpress, dtemp, temp, rho, self.qvap);

        dy[0] = dpress;
        dy[1] = dtemp;
        dy[2] = drho;
    }
}

impl Dynamics for SinusoidalParcelMotion {
    fn name(&self) -> &str {
        "SinusoidalParcelMotion"
    }

    fn run(
        &mut self,
        time: Time,
        timestep: Timestep,
        mut state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        if state.ncells() != 1 {
            return Err(MPhysError::Domain(format!(
                "{} only supports single-cell states, got {} cells",
                self.name(),
                state.ncells()
            )));
        }
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(MPhysError::Domain(format!(
                "timestep must be positive, got {timestep}"
            )));
        }
        state.check_physical()?;

        let cell = state.cell(0);
        let y0 = ParcelState::new(cell.pressure, cell.temperature, cell.density);
        let odes = ParcelOdes {
            motion: self,
            t_start: time,
            qvap: cell.q(MoistureCategory::Vapour),
        };

        let mut solver = Rk4::new(odes, 0.0, y0, timestep, self.substep(timestep));
        solver
            .integrate()
            .map_err(|e| MPhysError::Domain(format!("parcel integration failed: {e:?}")))?;

        let (_, y_out) = solver.results().get();
        let y_end = y_out
            .last()
            .ok_or_else(|| MPhysError::Domain("parcel integration produced no output".into()))?;

        state.pressure_mut()[0] = y_end[0];
        state.temperature_mut()[0] = y_end[1];
        state.density_mut()[0] = y_end[2];

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulae::moist_air_pressure;
    use crate::thermo::MixingRatios;
    use is_close::is_close;
    use ndarray::array;

    fn dry_parcel() -> ThermodynamicState {
        ThermodynamicState::parcel(288.15, 1.225, 101325.0, [0.0; 6]).unwrap()
    }

    #[test]
    fn pressure_returns_after_one_period() {
        let mut motion = SinusoidalParcelMotion::new(10000.0, 10.0).unwrap();
        let timestep = 0.1;
        let mut state = dry_parcel();
        let mut time = 0.0;
        for _ in 0..100 {
            state = motion.run(time, timestep, state).unwrap();
            time += timestep;
        }
        assert!(
            (state.pressure()[0] - 101325.0).abs() < 1e-3,
            "pressure after one period: {}",
            state.pressure()[0]
        );
    }

    #[test]
    fn quarter_period_lowers_pressure_by_amplitude() {
        let mut motion = SinusoidalParcelMotion::new(1000.0, 40.0).unwrap();
        let state = motion.run(0.0, 10.0, dry_parcel()).unwrap();
        // P(t) = P0 - A sin(wt)
        assert!(is_close!(
            state.pressure()[0],
            101325.0 - 1000.0,
            rel_tol = 1e-8
        ));
        assert!(state.temperature()[0] < 288.15);
        assert!(state.density()[0] < 1.225);
    }

    #[test]
    fn expansion_is_consistent_with_ideal_gas() {
        // Start from a state satisfying p = rho R T and check the relation is kept
        let temp = 288.15;
        let rho = 1.2;
        let qvap = 0.01;
        let press = moist_air_pressure(rho, temp, qvap);
        let state = ThermodynamicState::parcel(temp, rho, press, [qvap, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();

        let mut motion = SinusoidalParcelMotion::new(5000.0, 100.0).unwrap();
        let state = motion.run(0.0, 5.0, state).unwrap();

        let expected = moist_air_pressure(state.density()[0], state.temperature()[0], qvap);
        assert!(is_close!(state.pressure()[0], expected, rel_tol = 1e-6));
    }

    #[test]
    fn moisture_is_untouched() {
        let mut motion = SinusoidalParcelMotion::new(10000.0, 10.0).unwrap();
        let state = ThermodynamicState::parcel(
            288.15,
            1.225,
            101325.0,
            [0.015, 0.001, 0.0, 0.0002, 0.0, 0.0],
        )
        .unwrap();
        let result = motion.run(0.0, 1.0, state.clone()).unwrap();
        assert_eq!(result.mixing_ratios(), state.mixing_ratios());
    }

    #[test]
    fn multi_cell_state_is_rejected() {
        let state = ThermodynamicState::new(
            array![288.0, 280.0],
            array![1.2, 1.1],
            array![1e5, 9e4],
            MixingRatios::zeros(2),
        )
        .unwrap();
        let mut motion = SinusoidalParcelMotion::new(10000.0, 10.0).unwrap();
        let err = motion.run(0.0, 1.0, state).unwrap_err();
        assert!(matches!(err, MPhysError::Domain(_)));
    }

    #[test]
    fn non_positive_density_is_rejected() {
        let state = ThermodynamicState::parcel(288.0, 0.0, 1e5, [0.0; 6]).unwrap();
        let mut motion = SinusoidalParcelMotion::new(10000.0, 10.0).unwrap();
        assert!(matches!(
            motion.run(0.0, 1.0, state),
            Err(MPhysError::Domain(_))
        ));
    }

    #[test]
    fn invalid_parameters() {
        assert!(matches!(
            SinusoidalParcelMotion::new(100.0, 0.0),
            Err(MPhysError::Configuration(_))
        ));
        let params: ParcelMotionParameters = toml::from_str("amplitude = 500.0").unwrap();
        assert_eq!(params.period, 10.0);
        assert!(SinusoidalParcelMotion::from_parameters(params).is_ok());
    }
}
