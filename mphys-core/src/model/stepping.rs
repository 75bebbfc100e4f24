use crate::errors::{MPhysError, MPhysResult};
use crate::{Time, Timestep};
use serde::{Deserialize, Serialize};

/// Relative slack when counting the steps in an interval, so that `(10 - 0) / 0.1` counts 100.
const STEP_TOLERANCE: f64 = 1e-9;

/// Uniform steps covering `[time_init, time_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStepping {
    time_init: Time,
    time_end: Time,
    timestep: Timestep,
}

impl TimeStepping {
    /// # Errors
    ///
    /// [`MPhysError::Configuration`] unless `timestep > 0` and `time_end >= time_init`.
    pub fn new(time_init: Time, time_end: Time, timestep: Timestep) -> MPhysResult<Self> {
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(MPhysError::Configuration(format!(
                "timestep must be positive, got {timestep}"
            )));
        }
        if !(time_init.is_finite() && time_end.is_finite()) || time_end < time_init {
            return Err(MPhysError::Configuration(format!(
                "time_end ({time_end}) must not be before time_init ({time_init})"
            )));
        }
        Ok(Self {
            time_init,
            time_end,
            timestep,
        })
    }

    pub fn time_init(&self) -> Time {
        self.time_init
    }

    pub fn time_end(&self) -> Time {
        self.time_end
    }

    pub fn timestep(&self) -> Timestep {
        self.timestep
    }

    /// Number of whole steps that fit between `time_init` and `time_end`.
    pub fn nsteps(&self) -> usize {
        ((self.time_end - self.time_init) / self.timestep + STEP_TOLERANCE).floor() as usize
    }

    /// Time at the start of step `index`, or at the end of the run for `index == nsteps()`.
    pub fn time_at(&self, index: usize) -> Time {
        self.time_init + index as Time * self.timestep
    }

    /// Whether the interval is a whole number of steps.
    pub fn is_exact(&self) -> bool {
        let end = self.time_at(self.nsteps());
        (end - self.time_end).abs() <= STEP_TOLERANCE * self.timestep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_steps() {
        let stepping = TimeStepping::new(0.0, 10.0, 1.0).unwrap();
        assert_eq!(stepping.nsteps(), 10);
        assert_eq!(stepping.time_at(10), 10.0);
        assert!(stepping.is_exact());

        let stepping = TimeStepping::new(0.0, 10.0, 0.1).unwrap();
        assert_eq!(stepping.nsteps(), 100);

        let stepping = TimeStepping::new(0.0, 10.5, 1.0).unwrap();
        assert_eq!(stepping.nsteps(), 10);
        assert!(!stepping.is_exact());

        let stepping = TimeStepping::new(5.0, 5.0, 1.0).unwrap();
        assert_eq!(stepping.nsteps(), 0);
    }

    #[test]
    fn invalid_stepping() {
        assert!(matches!(
            TimeStepping::new(0.0, 10.0, 0.0),
            Err(MPhysError::Configuration(_))
        ));
        assert!(matches!(
            TimeStepping::new(0.0, 10.0, -1.0),
            Err(MPhysError::Configuration(_))
        ));
        assert!(matches!(
            TimeStepping::new(10.0, 0.0, 1.0),
            Err(MPhysError::Configuration(_))
        ));
    }
}
