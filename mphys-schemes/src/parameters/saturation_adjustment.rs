//! Saturation Adjustment Parameters

use mphys_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Controls the Newton iteration used to find the adjusted temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationAdjustmentParameters {
    /// Iteration stops once the temperature update is smaller than this
    /// unit: K
    /// default: 1e-8
    pub tolerance: FloatValue,

    /// Iterations allowed before the adjustment is reported as failed
    /// default: 20
    pub max_iterations: usize,
}

impl Default for SaturationAdjustmentParameters {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 20,
        }
    }
}
