//! Integration tests for the model module.
//!
//! These tests verify the complete build, initialise, step and finalise workflow for both
//! the parcel and the column cases.

mod column;
