//! Physical constants shared by the dynamics, formulae and schemes.
//!
//! Values follow the conventions of the parcel and rainshaft test cases:
//! molar masses and the universal gas constant define the specific gas constants
//! so that the ideal-gas relations used by the dynamics are self-consistent.

use crate::FloatValue;

/// Universal molar gas constant
/// unit: J / mol / K
pub const RGAS_UNIV: FloatValue = 8.314462618;

/// Molecular mass of dry air
/// unit: kg / mol
pub const MR_DRY: FloatValue = 0.028966216;

/// Molecular mass of water
/// unit: kg / mol
pub const MR_WATER: FloatValue = 0.01801528;

/// Specific gas constant for dry air (approx. 287 J/kg/K)
/// unit: J / kg / K
pub const RGAS_DRY: FloatValue = RGAS_UNIV / MR_DRY;

/// Specific gas constant for water vapour (approx. 461.5 J/kg/K)
/// unit: J / kg / K
pub const RGAS_VAP: FloatValue = RGAS_UNIV / MR_WATER;

/// Ratio of gas constants, dry air / water vapour (approx. 0.622)
pub const EPSILON: FloatValue = MR_WATER / MR_DRY;

/// Specific heat capacity of dry air at constant pressure
/// unit: J / kg / K
pub const CP_DRY: FloatValue = 1004.64;

/// Specific heat capacity of dry air at constant volume
/// unit: J / kg / K
pub const CV_DRY: FloatValue = CP_DRY - RGAS_DRY;

/// Specific heat capacity of water vapour at constant volume
/// unit: J / kg / K
pub const CV_VAP: FloatValue = 1407.95;

/// Specific heat capacity of liquid water
/// unit: J / kg / K
pub const C_LIQ: FloatValue = 4192.664;

/// Specific heat capacity of ice
/// unit: J / kg / K
pub const C_ICE: FloatValue = 2108.0;

/// Latent heat of vaporisation at the melting point
/// unit: J / kg
pub const LATENT_HEAT_VAP: FloatValue = 2.5008e6;

/// Melting point of water
/// unit: K
pub const T0: FloatValue = 273.15;

/// Reference pressure for potential temperatures
/// unit: Pa
pub const P1000: FloatValue = 100000.0;

/// Gravitational acceleration
/// unit: m / s^2
pub const GRAVITY: FloatValue = 9.80665;

/// Density of liquid water
/// unit: kg / m^3
pub const RHO_LIQ: FloatValue = 1000.0;
