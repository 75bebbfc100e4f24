//! A model couples one dynamics and one microphysics scheme and steps them through time.
//!
//! Each step first advances the state with the dynamics, then hands the result to the scheme.
//! The state returned by the scheme is recorded and becomes the state at the start of the
//! next step.
//! The initial state is recorded before the first step, so a run of `n` steps produces
//! `n + 1` samples.
//!
//! The scheme follows a fixed lifecycle: `initialize` once before the first step and
//! `finalize` once after the last.
//! The model enforces the ordering and refuses further steps after a failure.

mod builder;
mod lifecycle;
mod runtime;
mod stepping;

#[cfg(test)]
mod tests;

pub use builder::ModelBuilder;
pub use lifecycle::Lifecycle;
pub use runtime::Model;
pub use stepping::TimeStepping;
