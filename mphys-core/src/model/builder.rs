//! Model builder for coupling dynamics and a microphysics scheme.

use crate::column::ColumnGrid;
use crate::dynamics::Dynamics;
use crate::errors::{MPhysError, MPhysResult};
use crate::scheme::MicrophysicsScheme;
use crate::thermo::ThermodynamicState;
use tracing::warn;

use super::runtime::Model;
use super::stepping::TimeStepping;

/// Build a new model from its parts.
///
/// The builder validates that the parts are consistent before the scheme is initialised.
/// A time axis the dynamics cannot step on, or a column grid that differs from the grid of
/// the dynamics, is an [`MPhysError::Configuration`].
///
/// The dynamics and scheme are borrowed for the lifetime of the model so that the caller can
/// inspect them once the run is complete.
#[derive(Default)]
pub struct ModelBuilder<'a> {
    dynamics: Option<&'a mut dyn Dynamics>,
    scheme: Option<&'a mut dyn MicrophysicsScheme>,
    initial_state: Option<ThermodynamicState>,
    stepping: Option<TimeStepping>,
    column_grid: Option<ColumnGrid>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the non-microphysical dynamics.
    pub fn with_dynamics(&mut self, dynamics: &'a mut dyn Dynamics) -> &mut Self {
        self.dynamics = Some(dynamics);
        self
    }

    /// Set the microphysics scheme.
    pub fn with_scheme(&mut self, scheme: &'a mut dyn MicrophysicsScheme) -> &mut Self {
        self.scheme = Some(scheme);
        self
    }

    /// Set the state at `time_init`.
    pub fn with_initial_state(&mut self, state: ThermodynamicState) -> &mut Self {
        self.initial_state = Some(state);
        self
    }

    pub fn with_time_stepping(&mut self, stepping: TimeStepping) -> &mut Self {
        self.stepping = Some(stepping);
        self
    }

    /// Declare the vertical grid of a column model.
    ///
    /// The initial state must then have one cell per level.
    pub fn with_column_grid(&mut self, grid: ColumnGrid) -> &mut Self {
        self.column_grid = Some(grid);
        self
    }

    /// Validate the parts and build a [`Model`].
    ///
    /// The dynamics, scheme and initial state are moved into the model, so a builder
    /// can only be built once.
    pub fn build(&mut self) -> MPhysResult<Model<'a>> {
        let missing = |what: &str| MPhysError::Configuration(format!("no {what} was provided"));

        let stepping = self.stepping.ok_or_else(|| missing("time stepping"))?;
        let initial_state = self
            .initial_state
            .take()
            .ok_or_else(|| missing("initial state"))?;

        if initial_state.is_empty() {
            return Err(MPhysError::Configuration(
                "the initial state has no cells".to_string(),
            ));
        }
        let dynamics = self.dynamics.as_deref().ok_or_else(|| missing("dynamics"))?;
        dynamics.check_stepping(&stepping)?;

        if let Some(grid) = &self.column_grid {
            if let Some(dynamics_grid) = dynamics.column_grid() {
                if dynamics_grid != *grid {
                    return Err(MPhysError::Configuration(format!(
                        "the column grid ({} m spacing, {} m top) does not match the grid of \
                         {} ({} m spacing, {} m top)",
                        grid.z_delta(),
                        grid.z_max(),
                        dynamics.name(),
                        dynamics_grid.z_delta(),
                        dynamics_grid.z_max()
                    )));
                }
            }
            if grid.nlevels() != initial_state.ncells() {
                return Err(MPhysError::Configuration(format!(
                    "the column has {} levels but the initial state has {} cells",
                    grid.nlevels(),
                    initial_state.ncells()
                )));
            }
        }
        if !stepping.is_exact() {
            warn!(
                time_init = stepping.time_init(),
                time_end = stepping.time_end(),
                timestep = stepping.timestep(),
                "interval is not a whole number of steps, the run stops before time_end"
            );
        }

        let dynamics = self.dynamics.take().ok_or_else(|| missing("dynamics"))?;
        let scheme = self.scheme.take().ok_or_else(|| missing("microphysics scheme"))?;

        Ok(Model::new(dynamics, scheme, initial_state, stepping))
    }
}
