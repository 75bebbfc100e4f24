//! Core of the microphysics test cases.
//!
//! A test case couples a [`dynamics::Dynamics`] with a [`scheme::MicrophysicsScheme`]
//! and steps a [`thermo::ThermodynamicState`] through time, recording the result in an
//! [`output::OutputRecorder`].
//! Two cases are provided: a 0-D parcel forced by [`parcel::SinusoidalParcelMotion`] and a
//! 1-D KiD rainshaft driven by [`column::KidColumnDynamics`].

pub mod column;
pub mod config;
pub mod constants;
pub mod drivers;
pub mod dynamics;
pub mod engine;
pub mod errors;
pub mod formulae;
pub mod model;
pub mod output;
pub mod parcel;
pub mod scheme;
pub mod thermo;

pub type FloatValue = f64;
/// Time in seconds
pub type Time = FloatValue;
/// Duration of a step in seconds
pub type Timestep = FloatValue;
