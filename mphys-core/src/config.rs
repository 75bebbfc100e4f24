//! Test-case configuration loaded from TOML.
//!
//! Every field has a default, so a configuration file only needs to list what differs from
//! the standard case.
//!
//! ```rust
//! use mphys_core::config::ParcelCaseConfig;
//!
//! let config = ParcelCaseConfig::from_toml_str(
//!     r#"
//!     time_end = 20.0
//!
//!     [motion]
//!     amplitude = 5000.0
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.time_end, 20.0);
//! assert_eq!(config.motion.period, 10.0);
//! ```

use crate::column::{ColumnGrid, KidColumnDynamics, KidSettings};
use crate::drivers::{run_0d_parcel, run_1d_column};
use crate::errors::{MPhysError, MPhysResult};
use crate::model::TimeStepping;
use crate::output::OutputRecorder;
use crate::parcel::{ParcelMotionParameters, SinusoidalParcelMotion};
use crate::scheme::MicrophysicsScheme;
use crate::thermo::ThermodynamicState;
use crate::{FloatValue, Time, Timestep};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn from_toml_str<T: DeserializeOwned>(contents: &str) -> MPhysResult<T> {
    toml::from_str(contents).map_err(|e| MPhysError::Configuration(e.to_string()))
}

fn from_path<T: DeserializeOwned>(path: &Path) -> MPhysResult<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        MPhysError::Configuration(format!("could not read {}: {e}", path.display()))
    })?;
    from_toml_str(&contents)
}

/// Initial conditions of a parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelInitialConditions {
    /// unit: K
    pub temperature: FloatValue,
    /// unit: kg/m^3
    pub density: FloatValue,
    /// unit: Pa
    pub pressure: FloatValue,
    /// Order: [vapour, cloud, ice, rain, snow, graupel]
    /// unit: kg/kg
    pub mixing_ratios: [FloatValue; 6],
}

impl Default for ParcelInitialConditions {
    fn default() -> Self {
        Self {
            temperature: 288.15,
            density: 1.225,
            pressure: 101325.0,
            mixing_ratios: [0.015, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Configuration of the 0-D parcel case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelCaseConfig {
    pub time_init: Time,
    pub time_end: Time,
    pub timestep: Timestep,
    pub motion: ParcelMotionParameters,
    pub initial: ParcelInitialConditions,
}

impl Default for ParcelCaseConfig {
    fn default() -> Self {
        Self {
            time_init: 0.0,
            time_end: 10.0,
            timestep: 1.0,
            motion: ParcelMotionParameters::default(),
            initial: ParcelInitialConditions::default(),
        }
    }
}

impl ParcelCaseConfig {
    pub fn from_toml_str(contents: &str) -> MPhysResult<Self> {
        from_toml_str(contents)
    }

    pub fn from_path(path: impl AsRef<Path>) -> MPhysResult<Self> {
        from_path(path.as_ref())
    }

    pub fn stepping(&self) -> MPhysResult<TimeStepping> {
        TimeStepping::new(self.time_init, self.time_end, self.timestep)
    }

    pub fn motion(&self) -> MPhysResult<SinusoidalParcelMotion> {
        SinusoidalParcelMotion::from_parameters(self.motion.clone())
    }

    pub fn initial_state(&self) -> MPhysResult<ThermodynamicState> {
        ThermodynamicState::parcel(
            self.initial.temperature,
            self.initial.density,
            self.initial.pressure,
            self.initial.mixing_ratios,
        )
    }

    /// Run the configured case with `scheme`.
    pub fn run(&self, scheme: &mut dyn MicrophysicsScheme) -> MPhysResult<OutputRecorder> {
        let mut motion = self.motion()?;
        run_0d_parcel(
            self.time_init,
            self.time_end,
            self.timestep,
            self.initial_state()?,
            &mut motion,
            scheme,
        )
    }
}

/// Configuration of the 1-D KiD rainshaft case.
///
/// The grid spacing, column height and timestep live in [`KidSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnCaseConfig {
    pub time_init: Time,
    pub time_end: Time,
    pub kid: KidSettings,
}

impl Default for ColumnCaseConfig {
    fn default() -> Self {
        Self {
            time_init: 0.0,
            time_end: 900.0,
            kid: KidSettings::default(),
        }
    }
}

impl ColumnCaseConfig {
    pub fn from_toml_str(contents: &str) -> MPhysResult<Self> {
        from_toml_str(contents)
    }

    pub fn from_path(path: impl AsRef<Path>) -> MPhysResult<Self> {
        from_path(path.as_ref())
    }

    pub fn grid(&self) -> MPhysResult<ColumnGrid> {
        self.kid.grid()
    }

    pub fn dynamics(&self) -> MPhysResult<KidColumnDynamics> {
        KidColumnDynamics::new(self.kid.clone())
    }

    /// Run the configured case with `scheme`, starting from the column at rest.
    pub fn run(&self, scheme: &mut dyn MicrophysicsScheme) -> MPhysResult<OutputRecorder> {
        let grid = self.grid()?;
        let mut dynamics = self.dynamics()?;
        let initial_state = dynamics.initial_state()?;
        run_1d_column(
            &grid,
            self.time_init,
            self.time_end,
            self.kid.timestep,
            initial_state,
            &mut dynamics,
            scheme,
        )
    }
}
