//! Test cases for comparing interchangeable cloud microphysics schemes.
//!
//! The contracts, dynamics and drivers live in [`mphys_core`], the concrete schemes in
//! [`mphys_schemes`].
//! With the `python` feature the crate also builds the `mphys._lib` extension module.

pub use mphys_core;
pub use mphys_schemes;

#[cfg(feature = "python")]
mod python;
