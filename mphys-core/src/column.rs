//! Kinematic (KiD) rainshaft column following Shipway & Hill (2012).
//!
//! The column is forced by a prescribed momentum flux `rho_d w(t)` which is sinusoidal in time
//! until `t1` and zero afterwards.
//! Vapour and cloud liquid are transported upwards through a hydrostatically balanced column
//! whose dry-air density, pressure and temperature profiles are computed once at construction.
//!
//! Transport uses a first-order donor-cell scheme in flux form with the dry-air density as the
//! G-factor, which conserves the column-integrated mass apart from the boundary fluxes.

use crate::constants::{CP_DRY, EPSILON, GRAVITY, P1000, RGAS_DRY};
use crate::dynamics::Dynamics;
use crate::errors::{MPhysError, MPhysResult};
use crate::model::TimeStepping;
use crate::thermo::{MixingRatios, MoistureCategory, ThermodynamicState};
use crate::{FloatValue, Time, Timestep};
use ndarray::{Array1, ArrayViewMut1};
use ode_solvers::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

type PressureState = Vector1<FloatValue>;

/// Vertical discretisation of a column.
///
/// `z_max` is the top of the highest cell and must be a whole multiple of `z_delta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnGrid {
    z_delta: FloatValue,
    z_max: FloatValue,
    nlevels: usize,
}

impl ColumnGrid {
    /// # Errors
    ///
    /// [`MPhysError::Configuration`] if either length is non-positive or `z_max` is not a
    /// multiple of `z_delta`.
    pub fn new(z_delta: FloatValue, z_max: FloatValue) -> MPhysResult<Self> {
        if !(z_delta.is_finite() && z_delta > 0.0 && z_max.is_finite() && z_max > 0.0) {
            return Err(MPhysError::Configuration(format!(
                "column extent must be positive, got z_delta={z_delta}, z_max={z_max}"
            )));
        }
        let ratio = (z_max / z_delta).round();
        if (ratio * z_delta - z_max).abs() > 1e-9 * z_max {
            return Err(MPhysError::Configuration(format!(
                "z_max={z_max} is not a multiple of the grid spacing z_delta={z_delta}"
            )));
        }
        Ok(Self {
            z_delta,
            z_max,
            nlevels: ratio as usize,
        })
    }

    pub fn z_delta(&self) -> FloatValue {
        self.z_delta
    }

    pub fn z_max(&self) -> FloatValue {
        self.z_max
    }

    pub fn nlevels(&self) -> usize {
        self.nlevels
    }

    /// Heights of the cell centres, `(k + 1/2) * z_delta`.
    pub fn full_levels(&self) -> Array1<FloatValue> {
        Array1::from_iter((0..self.nlevels).map(|k| (k as FloatValue + 0.5) * self.z_delta))
    }

    /// Heights of the cell interfaces, `0` to `z_max`.
    pub fn half_levels(&self) -> Array1<FloatValue> {
        Array1::from_iter((0..=self.nlevels).map(|k| k as FloatValue * self.z_delta))
    }
}

/// A piecewise-linear profile through `(height, value)` points.
///
/// Values beyond the outermost points are held constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearProfile {
    pub heights: Vec<FloatValue>,
    pub values: Vec<FloatValue>,
}

impl LinearProfile {
    pub fn new(heights: Vec<FloatValue>, values: Vec<FloatValue>) -> MPhysResult<Self> {
        let profile = Self { heights, values };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> MPhysResult<()> {
        if self.heights.is_empty() || self.heights.len() != self.values.len() {
            return Err(MPhysError::Configuration(format!(
                "profile needs matching, non-empty heights and values, got {} and {}",
                self.heights.len(),
                self.values.len()
            )));
        }
        if self.heights.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MPhysError::Configuration(
                "profile heights must be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }

    pub fn at(&self, z: FloatValue) -> FloatValue {
        let n = self.heights.len();
        if z <= self.heights[0] {
            return self.values[0];
        }
        if z >= self.heights[n - 1] {
            return self.values[n - 1];
        }
        let above = self.heights.partition_point(|h| *h <= z);
        let below = above - 1;
        let run = self.heights[above] - self.heights[below];
        let rise = self.values[above] - self.values[below];
        self.values[below] + (z - self.heights[below]) * rise / run
    }
}

/// Settings of the KiD rainshaft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KidSettings {
    /// unit: m
    pub z_delta: FloatValue,
    /// unit: m
    pub z_max: FloatValue,
    /// Coupling timestep, every call to `run` must use it
    /// unit: s
    pub timestep: Timestep,
    /// Amplitude of the momentum flux forcing
    /// unit: kg m^-2 s^-1
    pub rhod_w_const: FloatValue,
    /// Time after which the forcing stops
    /// unit: s
    pub t1: Time,
    /// Surface pressure
    /// unit: Pa
    pub p0: FloatValue,
    /// Vapour mixing ratio profile (kg/kg)
    pub qvap: LinearProfile,
    /// Dry potential temperature profile (K)
    pub theta_dry: LinearProfile,
}

impl Default for KidSettings {
    fn default() -> Self {
        Self {
            z_delta: 25.0,
            z_max: 3200.0,
            timestep: 0.125,
            rhod_w_const: 3.0,
            t1: 600.0,
            p0: 100700.0,
            qvap: LinearProfile {
                heights: vec![0.0, 740.0, 3260.0],
                values: vec![0.015, 0.0138, 0.0024],
            },
            theta_dry: LinearProfile {
                heights: vec![0.0, 740.0, 3260.0],
                values: vec![297.9, 297.9, 312.66],
            },
        }
    }
}

impl KidSettings {
    pub fn grid(&self) -> MPhysResult<ColumnGrid> {
        ColumnGrid::new(self.z_delta, self.z_max)
    }

    /// Prescribed momentum flux at time `t`.
    pub fn rhod_w(&self, t: Time) -> FloatValue {
        if t < self.t1 {
            self.rhod_w_const * (PI * t / self.t1).sin()
        } else {
            0.0
        }
    }
}

/// Hydrostatic balance of moist air in a column with prescribed `qv(z)` and `theta_d(z)`.
struct Hydrostatic<'a> {
    settings: &'a KidSettings,
}

impl Hydrostatic<'_> {
    /// Temperature and dry-air density at height `z` given the total pressure.
    fn temp_and_rhod(&self, z: FloatValue, press: FloatValue) -> (FloatValue, FloatValue) {
        let qvap = self.settings.qvap.at(z);
        let press_dry = press / (1.0 + qvap / EPSILON);
        let temp = self.settings.theta_dry.at(z) * (press_dry / P1000).powf(RGAS_DRY / CP_DRY);
        (temp, press_dry / (RGAS_DRY * temp))
    }
}

impl System<FloatValue, PressureState> for Hydrostatic<'_> {
    fn system(&self, z: FloatValue, y: &PressureState, dy: &mut PressureState) {
        let (_, rhod) = self.temp_and_rhod(z, y[0]);
        dy[0] = -GRAVITY * rhod * (1.0 + self.settings.qvap.at(z));
    }
}

/// KiD column dynamics.
///
/// Every call to [`Dynamics::run`] advects the vapour and cloud fields of the incoming state
/// and resets its pressure and density to the prescribed profiles.
/// Temperature and the remaining categories pass through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KidColumnDynamics {
    settings: KidSettings,
    grid: ColumnGrid,
    rhod: Array1<FloatValue>,
    temperature: Array1<FloatValue>,
    pressure: Array1<FloatValue>,
    qvap: Array1<FloatValue>,
}

impl KidColumnDynamics {
    /// Build the column and its hydrostatic profiles.
    pub fn new(settings: KidSettings) -> MPhysResult<Self> {
        let grid = settings.grid()?;
        settings.qvap.validate()?;
        settings.theta_dry.validate()?;
        if !(settings.timestep.is_finite() && settings.timestep > 0.0) {
            return Err(MPhysError::Configuration(format!(
                "timestep must be positive, got {}",
                settings.timestep
            )));
        }
        if !(settings.p0 > 0.0) {
            return Err(MPhysError::Configuration(format!(
                "surface pressure must be positive, got {}",
                settings.p0
            )));
        }

        // Integrate in half-level steps so that every full level is an output point
        let hydrostatic = Hydrostatic {
            settings: &settings,
        };
        let step = grid.z_delta() / 2.0;
        let mut solver = Rk4::new(
            hydrostatic,
            0.0,
            PressureState::new(settings.p0),
            grid.z_max(),
            step,
        );
        solver.integrate().map_err(|e| {
            MPhysError::Configuration(format!("hydrostatic profile integration failed: {e:?}"))
        })?;
        let (_, y_out) = solver.results().get();

        let nlevels = grid.nlevels();
        if y_out.len() < 2 * nlevels + 1 {
            return Err(MPhysError::Configuration(format!(
                "hydrostatic profile has {} points, expected {}",
                y_out.len(),
                2 * nlevels + 1
            )));
        }

        let hydrostatic = Hydrostatic {
            settings: &settings,
        };
        let zfull = grid.full_levels();
        let pressure = Array1::from_iter((0..nlevels).map(|k| y_out[2 * k + 1][0]));
        let mut temperature = Array1::zeros(nlevels);
        let mut rhod = Array1::zeros(nlevels);
        for k in 0..nlevels {
            let (temp, rho) = hydrostatic.temp_and_rhod(zfull[k], pressure[k]);
            temperature[k] = temp;
            rhod[k] = rho;
        }
        let qvap = zfull.mapv(|z| settings.qvap.at(z));

        if pressure.iter().any(|p| !(*p > 0.0)) {
            return Err(MPhysError::Configuration(
                "column is too deep for the surface pressure".to_string(),
            ));
        }

        Ok(Self {
            settings,
            grid,
            rhod,
            temperature,
            pressure,
            qvap,
        })
    }

    pub fn settings(&self) -> &KidSettings {
        &self.settings
    }

    pub fn grid(&self) -> &ColumnGrid {
        &self.grid
    }

    /// Dry-air density at full levels
    pub fn rhod_profile(&self) -> &Array1<FloatValue> {
        &self.rhod
    }

    pub fn temperature_profile(&self) -> &Array1<FloatValue> {
        &self.temperature
    }

    pub fn pressure_profile(&self) -> &Array1<FloatValue> {
        &self.pressure
    }

    /// The column at rest: prescribed profiles and no condensate.
    pub fn initial_state(&self) -> MPhysResult<ThermodynamicState> {
        let mut mixing_ratios = MixingRatios::zeros(self.grid.nlevels());
        mixing_ratios.set(MoistureCategory::Vapour, self.qvap.clone())?;
        ThermodynamicState::new(
            self.temperature.clone(),
            self.rhod.clone(),
            self.pressure.clone(),
            mixing_ratios,
        )
    }

    /// The Courant number of the forcing over the step starting at `time`.
    ///
    /// This is the advector in density-weighted form, `rho_d w dt / dz`.
    pub fn courant_number(&self, time: Time) -> FloatValue {
        let timestep = self.settings.timestep;
        self.settings.rhod_w(time + 0.5 * timestep) * timestep / self.grid.z_delta()
    }

    fn check_timestep(&self, timestep: Timestep) -> MPhysResult<()> {
        if (timestep - self.settings.timestep).abs() > 1e-12 * self.settings.timestep {
            return Err(MPhysError::Configuration(format!(
                "timestep {timestep} does not match the column timestep {}",
                self.settings.timestep
            )));
        }
        Ok(())
    }

    /// One donor-cell step of `psi` with constant advector `gc` and G-factor `rhod`.
    ///
    /// Zero-gradient ghost cells are used at both ends.
    fn advect(mut psi: ArrayViewMut1<FloatValue>, gc: FloatValue, rhod: &Array1<FloatValue>) {
        let n = psi.len();
        if n == 0 {
            return;
        }
        let upwind_flux = |left: FloatValue, right: FloatValue| {
            gc.max(0.0) * left + gc.min(0.0) * right
        };
        // fluxes[i] is the flux through the lower interface of cell i
        let mut fluxes = Array1::zeros(n + 1);
        fluxes[0] = upwind_flux(psi[0], psi[0]);
        for i in 1..n {
            fluxes[i] = upwind_flux(psi[i - 1], psi[i]);
        }
        fluxes[n] = upwind_flux(psi[n - 1], psi[n - 1]);

        for i in 0..n {
            psi[i] -= (fluxes[i + 1] - fluxes[i]) / rhod[i];
        }
    }
}

impl Dynamics for KidColumnDynamics {
    fn name(&self) -> &str {
        "KidColumnDynamics"
    }

    fn check_stepping(&self, stepping: &TimeStepping) -> MPhysResult<()> {
        self.check_timestep(stepping.timestep())
    }

    fn column_grid(&self) -> Option<ColumnGrid> {
        Some(self.grid)
    }

    fn run(
        &mut self,
        time: Time,
        timestep: Timestep,
        mut state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        self.check_timestep(timestep)?;
        if state.ncells() != self.grid.nlevels() {
            return Err(MPhysError::Domain(format!(
                "state has {} cells but the column has {} levels",
                state.ncells(),
                self.grid.nlevels()
            )));
        }

        let gc = self.courant_number(time);
        let rhod_min = self.rhod.iter().cloned().fold(FloatValue::INFINITY, FloatValue::min);
        if gc.abs() / rhod_min >= 1.0 {
            return Err(MPhysError::Domain(format!(
                "Courant number {} is not below 1 at t={time}",
                gc.abs() / rhod_min
            )));
        }
        debug!(time, courant = gc, "advecting column");

        for category in [MoistureCategory::Vapour, MoistureCategory::Cloud] {
            Self::advect(state.mixing_ratios_mut().view_mut(category), gc, &self.rhod);
        }
        state.set_pressure(self.pressure.clone())?;
        state.set_density(self.rhod.clone())?;

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_settings() -> KidSettings {
        KidSettings {
            z_delta: 100.0,
            z_max: 2000.0,
            timestep: 1.0,
            ..KidSettings::default()
        }
    }

    #[test]
    fn grid_levels() {
        let grid = ColumnGrid::new(25.0, 3200.0).unwrap();
        assert_eq!(grid.nlevels(), 128);
        assert_eq!(grid.full_levels()[0], 12.5);
        assert_eq!(grid.half_levels()[128], 3200.0);

        let err = ColumnGrid::new(30.0, 100.0).unwrap_err();
        assert!(matches!(err, MPhysError::Configuration(_)));
        assert!(ColumnGrid::new(0.0, 100.0).is_err());
    }

    #[test]
    fn linear_profile() {
        let profile = LinearProfile::new(vec![0.0, 740.0, 3260.0], vec![0.015, 0.0138, 0.0024])
            .unwrap();
        assert_eq!(profile.at(0.0), 0.015);
        assert_relative_eq!(profile.at(370.0), 0.0144, epsilon = 1e-12);
        assert_eq!(profile.at(5000.0), 0.0024);
        assert!(LinearProfile::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn forcing_stops_after_t1() {
        let settings = KidSettings::default();
        assert_eq!(settings.rhod_w(0.0), 0.0);
        assert_relative_eq!(settings.rhod_w(300.0), 3.0, epsilon = 1e-12);
        assert_eq!(settings.rhod_w(600.0), 0.0);
        assert_eq!(settings.rhod_w(900.0), 0.0);
    }

    #[test]
    fn profiles_are_hydrostatic() {
        let dynamics = KidColumnDynamics::new(small_settings()).unwrap();
        let press = dynamics.pressure_profile();
        let rhod = dynamics.rhod_profile();

        // Decreasing with height
        assert!(press.windows(2).into_iter().all(|w| w[1] < w[0]));
        assert!(rhod.windows(2).into_iter().all(|w| w[1] < w[0]));

        // dp/dz ~ -g rho between neighbouring levels
        let zfull = dynamics.grid().full_levels();
        let qv0 = dynamics.settings().qvap.at(zfull[0]);
        let qv1 = dynamics.settings().qvap.at(zfull[1]);
        let rho_mean = 0.5 * (rhod[0] * (1.0 + qv0) + rhod[1] * (1.0 + qv1));
        let dpdz = (press[1] - press[0]) / 100.0;
        assert_relative_eq!(dpdz, -GRAVITY * rho_mean, max_relative = 1e-3);

        // Near-surface values are close to the prescribed surface pressure
        assert!(press[0] < 100700.0 && press[0] > 100000.0);
        assert!(dynamics.temperature_profile()[0] > 290.0);
    }

    #[test]
    fn initial_state_has_no_condensate() {
        let dynamics = KidColumnDynamics::new(small_settings()).unwrap();
        let state = dynamics.initial_state().unwrap();
        assert_eq!(state.ncells(), 20);
        assert!(state.mixing_ratios().total_condensate().iter().all(|q| *q == 0.0));
        assert_relative_eq!(
            state.mixing_ratios()[MoistureCategory::Vapour][0],
            0.015 - 0.0012 * 50.0 / 740.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn advection_conserves_mass_up_to_boundary_fluxes() {
        let mut dynamics = KidColumnDynamics::new(small_settings()).unwrap();
        let mut state = dynamics.initial_state().unwrap();
        state.mixing_ratios_mut().view_mut(MoistureCategory::Cloud)[5] = 1e-3;
        let rhod = dynamics.rhod_profile().clone();

        let time = 200.0;
        let gc = dynamics.courant_number(time);
        let cloud_before = (&rhod * &state.mixing_ratios()[MoistureCategory::Cloud]).sum();

        let state = dynamics.run(time, 1.0, state).unwrap();

        // No cloud at the boundaries so the column integral is unchanged
        let cloud_after = (&rhod * &state.mixing_ratios()[MoistureCategory::Cloud]).sum();
        assert_relative_eq!(cloud_after, cloud_before, max_relative = 1e-12);

        // Cloud moved upwards
        let cloud = &state.mixing_ratios()[MoistureCategory::Cloud];
        assert!(gc > 0.0);
        assert!(cloud[6] > 0.0);
        assert_eq!(cloud[4], 0.0);
    }

    #[test]
    fn pressure_and_density_are_reset() {
        let mut dynamics = KidColumnDynamics::new(small_settings()).unwrap();
        let mut state = dynamics.initial_state().unwrap();
        state.pressure_mut().fill(1.0);
        state.density_mut().fill(1.0);
        state.temperature_mut()[0] = 250.0;

        let state = dynamics.run(0.0, 1.0, state).unwrap();
        assert_eq!(state.pressure(), dynamics.pressure_profile().view());
        assert_eq!(state.density(), dynamics.rhod_profile().view());
        assert_eq!(state.temperature()[0], 250.0);
    }

    #[test]
    fn timestep_must_match() {
        let mut dynamics = KidColumnDynamics::new(small_settings()).unwrap();
        let state = dynamics.initial_state().unwrap();
        let err = dynamics.run(0.0, 2.0, state).unwrap_err();
        assert!(matches!(err, MPhysError::Configuration(_)));
    }

    #[test]
    fn stepping_is_checked_up_front() {
        let dynamics = KidColumnDynamics::new(small_settings()).unwrap();
        assert!(dynamics
            .check_stepping(&TimeStepping::new(0.0, 10.0, 1.0).unwrap())
            .is_ok());
        let err = dynamics
            .check_stepping(&TimeStepping::new(0.0, 10.0, 0.5).unwrap())
            .unwrap_err();
        assert!(matches!(err, MPhysError::Configuration(_)));

        assert_eq!(
            dynamics.column_grid(),
            Some(ColumnGrid::new(100.0, 2000.0).unwrap())
        );
    }

    #[test]
    fn large_courant_number_is_rejected() {
        let settings = KidSettings {
            z_delta: 10.0,
            z_max: 1000.0,
            timestep: 10.0,
            ..KidSettings::default()
        };
        let mut dynamics = KidColumnDynamics::new(settings).unwrap();
        let state = dynamics.initial_state().unwrap();
        let err = dynamics.run(300.0, 10.0, state).unwrap_err();
        assert!(matches!(err, MPhysError::Domain(_)));
    }

    #[test]
    fn wrong_cell_count_is_rejected() {
        let mut dynamics = KidColumnDynamics::new(small_settings()).unwrap();
        let state = ThermodynamicState::parcel(288.0, 1.2, 1e5, [0.0; 6]).unwrap();
        assert!(matches!(
            dynamics.run(0.0, 1.0, state),
            Err(MPhysError::Domain(_))
        ));
    }
}
