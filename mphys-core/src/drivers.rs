//! The two test-case drivers.
//!
//! Both drivers record the initial state, alternate dynamics and microphysics over every step
//! of `[time_init, time_end]` and return the finalised output.
//! A failure at any point aborts the run and no output is returned.

use crate::column::ColumnGrid;
use crate::dynamics::Dynamics;
use crate::errors::MPhysResult;
use crate::model::{ModelBuilder, TimeStepping};
use crate::output::OutputRecorder;
use crate::scheme::MicrophysicsScheme;
use crate::thermo::ThermodynamicState;
use crate::{Time, Timestep};

/// Run a 0-D parcel through `dynamics` and `scheme`.
///
/// With `time_end - time_init` a whole number `n` of timesteps, `n + 1` samples are recorded.
///
/// ```rust
/// use mphys_core::drivers::run_0d_parcel;
/// use mphys_core::dynamics::StaticDynamics;
/// use mphys_core::scheme::MicrophysicsScheme;
/// use mphys_core::thermo::ThermodynamicState;
/// use mphys_core::errors::MPhysResult;
///
/// #[derive(Debug)]
/// struct Identity;
///
/// impl MicrophysicsScheme for Identity {
///     fn name(&self) -> &str {
///         "Identity"
///     }
///
///     fn run(&mut self, _timestep: f64, state: ThermodynamicState) -> MPhysResult<ThermodynamicState> {
///         Ok(state)
///     }
/// }
///
/// let state = ThermodynamicState::parcel(288.15, 1.225, 101325.0, [0.015, 0.0, 0.0, 0.0, 0.0, 0.0])
///     .unwrap();
/// let output = run_0d_parcel(0.0, 10.0, 1.0, state, &mut StaticDynamics, &mut Identity).unwrap();
/// assert_eq!(output.len(), 11);
/// ```
pub fn run_0d_parcel(
    time_init: Time,
    time_end: Time,
    timestep: Timestep,
    thermo_init: ThermodynamicState,
    dynamics: &mut dyn Dynamics,
    scheme: &mut dyn MicrophysicsScheme,
) -> MPhysResult<OutputRecorder> {
    let stepping = TimeStepping::new(time_init, time_end, timestep)?;

    let mut model = ModelBuilder::new()
        .with_dynamics(dynamics)
        .with_scheme(scheme)
        .with_initial_state(thermo_init)
        .with_time_stepping(stepping)
        .build()?;

    model.initialize()?;
    model.run()?;
    model.finalize()?;
    model.into_output()
}

/// Run a 1-D column on `grid` through `dynamics` and `scheme`.
///
/// The initial state must have one cell per level of `grid`.
/// `grid` and `timestep` must match those of a column `dynamics`, otherwise the run fails
/// with [`MPhysError::Configuration`] before the scheme is initialised.
///
/// [`MPhysError::Configuration`]: crate::errors::MPhysError::Configuration
pub fn run_1d_column(
    grid: &ColumnGrid,
    time_init: Time,
    time_end: Time,
    timestep: Timestep,
    thermo_init: ThermodynamicState,
    dynamics: &mut dyn Dynamics,
    scheme: &mut dyn MicrophysicsScheme,
) -> MPhysResult<OutputRecorder> {
    let stepping = TimeStepping::new(time_init, time_end, timestep)?;

    let mut model = ModelBuilder::new()
        .with_dynamics(dynamics)
        .with_scheme(scheme)
        .with_initial_state(thermo_init)
        .with_time_stepping(stepping)
        .with_column_grid(*grid)
        .build()?;

    model.initialize()?;
    model.run()?;
    model.finalize()?;
    model.into_output()
}
