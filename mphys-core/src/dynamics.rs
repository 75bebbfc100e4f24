use crate::column::ColumnGrid;
use crate::errors::MPhysResult;
use crate::model::TimeStepping;
use crate::thermo::ThermodynamicState;
use crate::{Time, Timestep};
use std::fmt::Debug;

/// Non-microphysical evolution of a parcel or column.
///
/// A parcel model updates pressure, temperature and density.
/// A column model advects moisture through the column.
pub trait Dynamics: Debug {
    fn name(&self) -> &str;

    /// Reject a time axis the dynamics cannot be stepped on.
    ///
    /// Called when a model is built, before the scheme is initialised.
    fn check_stepping(&self, _stepping: &TimeStepping) -> MPhysResult<()> {
        Ok(())
    }

    /// The vertical grid the dynamics is defined on, if it is a column.
    fn column_grid(&self) -> Option<ColumnGrid> {
        None
    }

    /// Advance `state` over `[time, time + timestep]`.
    fn run(
        &mut self,
        time: Time,
        timestep: Timestep,
        state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState>;
}

/// Dynamics that leaves the state untouched.
///
/// Useful for exercising a scheme on a fixed thermodynamic background.
#[derive(Debug, Clone, Default)]
pub struct StaticDynamics;

impl Dynamics for StaticDynamics {
    fn name(&self) -> &str {
        "StaticDynamics"
    }

    fn run(
        &mut self,
        _time: Time,
        _timestep: Timestep,
        state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState> {
        Ok(state)
    }
}
