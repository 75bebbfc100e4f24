//! Warm Rain Parameters
//!
//! Coefficients of the Kessler-type warm-rain engine.
//!
//! # Reference
//!
//! Kessler (1969) autoconversion and accretion with the rain evaporation and terminal
//! velocity of Klemp and Wilhelmson (1978).

use mphys_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Parameters for the warm-rain engine
///
/// # Conversion Rates
///
/// Autoconversion of cloud to rain above a threshold:
///
/// $$ A_r = k_1 \max(0, q_c - a) $$
///
/// Accretion of cloud by rain:
///
/// $$ C_r = k_2 q_c q_r^{e} $$
///
/// # Sedimentation
///
/// Rain falls with
///
/// $$ V_t = v_0 (10^{-3} \rho q_r)^{b} \sqrt{\rho_0 / \rho} $$
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmRainParameters {
    /// Autoconversion rate (k1)
    /// unit: 1/s
    /// default: 0.001
    pub autoconversion_rate: FloatValue,

    /// Cloud mixing ratio below which no autoconversion happens (a)
    /// unit: kg/kg
    /// default: 0.001
    pub autoconversion_threshold: FloatValue,

    /// Accretion coefficient (k2)
    /// unit: 1/s
    /// default: 2.2
    pub accretion_coefficient: FloatValue,

    /// Accretion exponent on the rain mixing ratio (e)
    /// default: 0.875
    pub accretion_exponent: FloatValue,

    /// Terminal velocity coefficient (v0)
    /// unit: m/s
    /// default: 36.34
    pub terminal_velocity_coefficient: FloatValue,

    /// Terminal velocity exponent (b)
    /// default: 0.1364
    pub terminal_velocity_exponent: FloatValue,

    /// Reference density for the terminal velocity correction (rho0)
    /// unit: kg/m^3
    /// default: 1.225
    pub reference_density: FloatValue,

    /// Largest Courant number allowed for one sedimentation substep
    /// default: 0.9
    pub max_sedimentation_courant: FloatValue,
}

impl Default for WarmRainParameters {
    fn default() -> Self {
        Self {
            autoconversion_rate: 0.001,
            autoconversion_threshold: 0.001,
            accretion_coefficient: 2.2,
            accretion_exponent: 0.875,
            terminal_velocity_coefficient: 36.34,
            terminal_velocity_exponent: 0.1364,
            reference_density: 1.225,
            max_sedimentation_courant: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_defaults() {
        let parameters: WarmRainParameters =
            toml::from_str("autoconversion_threshold = 0.0005").unwrap();
        assert_eq!(parameters.autoconversion_threshold, 0.0005);
        assert_eq!(parameters.accretion_coefficient, 2.2);
        assert_eq!(parameters.max_sedimentation_courant, 0.9);
    }
}
