//! Microphysics schemes for the parcel and rainshaft test cases
//!
//! Every scheme implements [`mphys_core::scheme::MicrophysicsScheme`] so it can be dropped into
//! either driver.
//!
//! # Module Organisation
//!
//! - `null`, `mock`: pass-through and scripted test doubles
//! - `condensation`: pure bulk condensation of vapour onto cloud
//! - `saturation_adjustment`: constant-density saturation adjustment, as a routine and as a scheme
//! - `bulk`: one-moment bulk schemes backed by an engine, and the native warm-rain engine
//! - `superdroplet`: coupling to a superdroplet engine
//!
//! # Parameters
//!
//! Schemes with tunable coefficients take a parameters struct from the `parameters` module
//! with defaults matching the standard test cases.

pub mod bulk;
pub mod condensation;
pub mod mock;
pub mod null;
pub mod parameters;
pub mod saturation_adjustment;
pub mod superdroplet;

pub use bulk::{BulkEngine, OneMomentScheme, Precipitation, WarmRainEngine};
pub use condensation::BulkCondensationScheme;
pub use mock::MockScheme;
pub use null::NullScheme;
pub use saturation_adjustment::{SaturationAdjustment, SaturationAdjustmentScheme};
pub use superdroplet::{CoupledFields, SuperdropletConfig, SuperdropletEngine, SuperdropletScheme};
