//! The contract every microphysics scheme adapter satisfies.

use crate::errors::{MPhysError, MPhysResult};
use crate::thermo::ThermodynamicState;
use crate::{FloatValue, Timestep};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A microphysics scheme that can be driven by either test-case driver.
///
/// The driver calls [`MicrophysicsScheme::initialize`] once before the first
/// [`MicrophysicsScheme::run`] and [`MicrophysicsScheme::finalize`] once after the last.
///
/// `run` takes the state by value and returns the authoritative state for the end of the
/// timestep.
/// Implementations are free to modify the incoming state in place and return it.
pub trait MicrophysicsScheme: Debug {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// One-time setup, for example starting a native engine.
    fn initialize(&mut self) -> MPhysResult<()> {
        Ok(())
    }

    /// Advance the moisture and thermodynamic fields by one timestep.
    fn run(
        &mut self,
        timestep: Timestep,
        state: ThermodynamicState,
    ) -> MPhysResult<ThermodynamicState>;

    /// Release resources acquired in `initialize`.
    fn finalize(&mut self) -> MPhysResult<()> {
        Ok(())
    }
}

/// Fails with [`MPhysError::Domain`] unless `timestep` is positive and finite.
pub fn check_timestep(timestep: Timestep) -> MPhysResult<()> {
    if !(timestep.is_finite() && timestep > 0.0) {
        return Err(MPhysError::Domain(format!(
            "timestep must be positive, got {timestep}"
        )));
    }
    Ok(())
}

/// Shape and constant fields passed to an engine when a scheme is constructed.
///
/// The state handed to the scheme holds `nvec * nlevels` cells laid out column by column.
/// `ivstart` is the first column the engine operates on.
/// `dz` holds layer thicknesses (m) per cell, `qnc` the cloud droplet number
/// concentration (m^-3) per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub nvec: usize,
    pub nlevels: usize,
    pub ivstart: usize,
    pub dz: Array1<FloatValue>,
    pub qnc: Array1<FloatValue>,
}

impl GridSpec {
    /// Validated grid.
    ///
    /// # Errors
    ///
    /// [`MPhysError::Configuration`] if the shape is empty, `ivstart` lies outside the columns,
    /// or `dz`/`qnc` have the wrong length or non-positive entries.
    pub fn new(
        nvec: usize,
        nlevels: usize,
        ivstart: usize,
        dz: Array1<FloatValue>,
        qnc: Array1<FloatValue>,
    ) -> MPhysResult<Self> {
        let grid = Self {
            nvec,
            nlevels,
            ivstart,
            dz,
            qnc,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// A single parcel: one column with one level.
    pub fn parcel(dz: FloatValue, qnc: FloatValue) -> MPhysResult<Self> {
        Self::new(1, 1, 0, Array1::from_elem(1, dz), Array1::from_elem(1, qnc))
    }

    /// One column of `nlevels` levels with uniform thickness.
    pub fn column(nlevels: usize, dz: FloatValue, qnc: FloatValue) -> MPhysResult<Self> {
        Self::new(
            1,
            nlevels,
            0,
            Array1::from_elem(nlevels, dz),
            Array1::from_elem(1, qnc),
        )
    }

    pub fn validate(&self) -> MPhysResult<()> {
        if self.nvec == 0 || self.nlevels == 0 {
            return Err(MPhysError::Configuration(format!(
                "grid must have at least one column and level, got {}x{}",
                self.nvec, self.nlevels
            )));
        }
        if self.ivstart >= self.nvec {
            return Err(MPhysError::Configuration(format!(
                "ivstart {} is outside the {} columns",
                self.ivstart, self.nvec
            )));
        }
        if self.dz.len() != self.ncells() {
            return Err(MPhysError::Configuration(format!(
                "dz has {} entries, expected {}",
                self.dz.len(),
                self.ncells()
            )));
        }
        if self.qnc.len() != self.nvec {
            return Err(MPhysError::Configuration(format!(
                "qnc has {} entries, expected one per column ({})",
                self.qnc.len(),
                self.nvec
            )));
        }
        if self.dz.iter().chain(self.qnc.iter()).any(|v| !(*v > 0.0)) {
            return Err(MPhysError::Configuration(
                "dz and qnc must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Total number of cells.
    pub fn ncells(&self) -> usize {
        self.nvec * self.nlevels
    }

    /// Index into the flattened state for column `ivec` and level `k`.
    pub fn cell_index(&self, ivec: usize, k: usize) -> usize {
        ivec * self.nlevels + k
    }

    /// Fails with [`MPhysError::Domain`] if `state` does not have this grid's cell count.
    pub fn check_state(&self, state: &ThermodynamicState) -> MPhysResult<()> {
        if state.ncells() != self.ncells() {
            return Err(MPhysError::Domain(format!(
                "state has {} cells but the scheme grid has {} ({}x{})",
                state.ncells(),
                self.ncells(),
                self.nvec,
                self.nlevels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn grid_validation() {
        assert!(GridSpec::parcel(1.0, 5e8).is_ok());
        assert!(GridSpec::column(10, 50.0, 1e8).is_ok());

        let err = GridSpec::new(2, 1, 0, array![1.0, 1.0], array![1.0]).unwrap_err();
        assert!(matches!(err, MPhysError::Configuration(_)));

        let err = GridSpec::new(1, 2, 1, array![1.0, 1.0], array![1.0]).unwrap_err();
        assert!(matches!(err, MPhysError::Configuration(_)));

        let err = GridSpec::new(1, 2, 0, array![1.0, 0.0], array![1.0]).unwrap_err();
        assert!(matches!(err, MPhysError::Configuration(_)));

        assert!(GridSpec::column(0, 1.0, 1.0).is_err());
    }

    #[test]
    fn cell_layout() {
        let grid = GridSpec::new(2, 3, 0, Array1::ones(6), Array1::ones(2)).unwrap();
        assert_eq!(grid.ncells(), 6);
        assert_eq!(grid.cell_index(0, 2), 2);
        assert_eq!(grid.cell_index(1, 0), 3);
    }

    #[test]
    fn timestep_must_be_positive() {
        assert!(check_timestep(1.0).is_ok());
        assert!(check_timestep(0.0).is_err());
        assert!(check_timestep(-1.0).is_err());
        assert!(check_timestep(f64::NAN).is_err());
    }
}
