//! Scheme parameters
//!
//! Each parameter struct provides defaults matching the standard test cases and can be
//! deserialised from a partial TOML table.

mod saturation_adjustment;
mod warm_rain;

pub use saturation_adjustment::SaturationAdjustmentParameters;
pub use warm_rain::WarmRainParameters;
