//! Model struct and runtime execution.

use crate::dynamics::Dynamics;
use crate::errors::{MPhysError, MPhysResult};
use crate::output::OutputRecorder;
use crate::scheme::MicrophysicsScheme;
use crate::thermo::ThermodynamicState;
use crate::Time;
use tracing::{debug, info, warn};

use super::lifecycle::Lifecycle;
use super::stepping::TimeStepping;

/// A dynamics and a microphysics scheme solved together on a uniform time axis.
///
/// The model owns the thermodynamic state between steps.
/// During a step it hands the state to the dynamics, then passes the returned state to the
/// scheme, and keeps what the scheme returns.
/// Neither collaborator ever sees the state while the other holds it.
#[derive(Debug)]
pub struct Model<'a> {
    dynamics: &'a mut dyn Dynamics,
    scheme: &'a mut dyn MicrophysicsScheme,
    /// `None` only while a step is in progress or after it failed
    state: Option<ThermodynamicState>,
    stepping: TimeStepping,
    time_index: usize,
    lifecycle: Lifecycle,
    output: OutputRecorder,
}

impl<'a> Model<'a> {
    pub(super) fn new(
        dynamics: &'a mut dyn Dynamics,
        scheme: &'a mut dyn MicrophysicsScheme,
        initial_state: ThermodynamicState,
        stepping: TimeStepping,
    ) -> Self {
        let output = OutputRecorder::new(initial_state.ncells());
        Self {
            dynamics,
            scheme,
            state: Some(initial_state),
            stepping,
            time_index: 0,
            lifecycle: Lifecycle::Uninitialized,
            output,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn stepping(&self) -> &TimeStepping {
        &self.stepping
    }

    /// Gets the time value at the current step.
    pub fn current_time(&self) -> Time {
        self.stepping.time_at(self.time_index)
    }

    /// Number of completed steps.
    pub fn time_index(&self) -> usize {
        self.time_index
    }

    /// Returns true if the model has no more time steps to process.
    pub fn finished(&self) -> bool {
        self.time_index >= self.stepping.nsteps()
    }

    /// The state at [`Model::current_time`].
    pub fn state(&self) -> Option<&ThermodynamicState> {
        self.state.as_ref()
    }

    pub fn output(&self) -> &OutputRecorder {
        &self.output
    }

    fn expect_lifecycle(&self, expected: Lifecycle, operation: &str) -> MPhysResult<()> {
        if self.lifecycle != expected {
            return Err(MPhysError::InvalidState(format!(
                "cannot {operation} a model that is {}",
                self.lifecycle
            )));
        }
        Ok(())
    }

    fn fail(&mut self, err: MPhysError) -> MPhysError {
        warn!(
            scheme = self.scheme.name(),
            time = self.current_time(),
            error = %err,
            "model run failed"
        );
        self.lifecycle = Lifecycle::Failed;
        err
    }

    /// Initialise the scheme and record the initial state.
    pub fn initialize(&mut self) -> MPhysResult<()> {
        self.expect_lifecycle(Lifecycle::Uninitialized, "initialize")?;

        if let Err(err) = self.scheme.initialize() {
            return Err(self.fail(err));
        }

        let time = self.current_time();
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| MPhysError::InvalidState("model has no state".to_string()))?;
        self.output.record(time, state)?;
        self.lifecycle = Lifecycle::Running;

        info!(
            scheme = self.scheme.name(),
            dynamics = self.dynamics.name(),
            nsteps = self.stepping.nsteps(),
            ncells = state.ncells(),
            "model initialised"
        );
        Ok(())
    }

    fn advance(&mut self, state: ThermodynamicState) -> MPhysResult<ThermodynamicState> {
        let time = self.current_time();
        let timestep = self.stepping.timestep();

        let state = self.dynamics.run(time, timestep, state)?;
        let state = self.scheme.run(timestep, state)?;

        // The output state represents the end of the current step
        self.output.record(self.stepping.time_at(self.time_index + 1), &state)?;
        Ok(state)
    }

    /// Steps the model forward one time step.
    ///
    /// After an error the model is marked as [`Lifecycle::Failed`] and can no longer be
    /// stepped or finalised.
    pub fn step(&mut self) -> MPhysResult<()> {
        self.expect_lifecycle(Lifecycle::Running, "step")?;
        if self.finished() {
            return Err(MPhysError::InvalidState(format!(
                "no steps remain after t={}",
                self.current_time()
            )));
        }

        let state = self
            .state
            .take()
            .ok_or_else(|| MPhysError::InvalidState("model has no state".to_string()))?;

        debug!(time = self.current_time(), index = self.time_index, "step");
        match self.advance(state) {
            Ok(state) => {
                self.state = Some(state);
                self.time_index += 1;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Steps the model until the end of the time axis.
    pub fn run(&mut self) -> MPhysResult<()> {
        while !self.finished() {
            self.step()?;
        }
        Ok(())
    }

    /// Finalise the scheme and freeze the output.
    pub fn finalize(&mut self) -> MPhysResult<()> {
        self.expect_lifecycle(Lifecycle::Running, "finalize")?;

        if let Err(err) = self.scheme.finalize() {
            return Err(self.fail(err));
        }
        self.output.finalize()?;
        self.lifecycle = Lifecycle::Finalized;

        info!(
            scheme = self.scheme.name(),
            steps = self.time_index,
            samples = self.output.len(),
            "model finalised"
        );
        Ok(())
    }

    /// The recorded output of a finalised model.
    pub fn into_output(self) -> MPhysResult<OutputRecorder> {
        self.expect_lifecycle(Lifecycle::Finalized, "take the output of")?;
        Ok(self.output)
    }
}
