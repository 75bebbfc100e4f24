//! Thermodynamic formulae used by the dynamics, schemes and output diagnostics.
//!
//! All functions operate on single cells; array-valued callers iterate over cells.

use crate::constants::{CP_DRY, EPSILON, RGAS_DRY, RGAS_VAP, T0};
use crate::errors::{MPhysError, MPhysResult};
use crate::FloatValue;

// August-Roche-Magnus coefficients over liquid water
const MAGNUS_A: FloatValue = 610.94;
const MAGNUS_B: FloatValue = 17.625;
const MAGNUS_C: FloatValue = 243.04;

// Tetens coefficients over liquid water (as used by ICON's saturation adjustment)
const TETENS_C1: FloatValue = 610.78;
const TETENS_C3: FloatValue = 17.269;
const TETENS_C4: FloatValue = 35.86;

/// Saturation vapour pressure over liquid water
///
/// $$ p_{vs} = A \exp\left(\frac{B (T - T_0)}{T - T_0 + C}\right) $$
///
/// unit: Pa
pub fn saturation_vapour_pressure(temp: FloatValue) -> FloatValue {
    let celsius = temp - T0;
    MAGNUS_A * (MAGNUS_B * celsius / (celsius + MAGNUS_C)).exp()
}

/// Partial pressure of water vapour given the vapour mass mixing ratio
///
/// $$ p_v = \frac{p \, q_v}{q_v + \epsilon} $$
pub fn vapour_pressure(press: FloatValue, qvap: FloatValue) -> FloatValue {
    press * qvap / (qvap + EPSILON)
}

/// Relative humidity (fraction, 1.0 is saturation)
///
/// Fails with [`MPhysError::Domain`] if the saturation vapour pressure
/// is not a finite positive number, which indicates physically invalid input.
pub fn relative_humidity(
    temp: FloatValue,
    press: FloatValue,
    qvap: FloatValue,
) -> MPhysResult<FloatValue> {
    let pvs = saturation_vapour_pressure(temp);
    if !pvs.is_finite() || pvs <= 0.0 {
        return Err(MPhysError::Domain(format!(
            "saturation vapour pressure {pvs} Pa is degenerate at T={temp} K"
        )));
    }
    Ok(vapour_pressure(press, qvap) / pvs)
}

/// Supersaturation, i.e. relative humidity minus one
pub fn supersaturation(
    temp: FloatValue,
    press: FloatValue,
    qvap: FloatValue,
) -> MPhysResult<FloatValue> {
    Ok(relative_humidity(temp, press, qvap)? - 1.0)
}

/// Potential temperature of dry air relative to a reference pressure
///
/// $$ \theta_{dry} = T \left(\frac{P_{ref}}{P}\right)^{R_{dry} / c_{p,dry}} $$
pub fn dry_potential_temperature(
    temp: FloatValue,
    press: FloatValue,
    press_ref: FloatValue,
) -> FloatValue {
    temp * (press_ref / press).powf(RGAS_DRY / CP_DRY)
}

/// Pressure of moist air from the ideal-gas law
///
/// $$ P = \rho R_{dry} \left(1 + \frac{q_v}{\epsilon}\right) T $$
pub fn moist_air_pressure(rho: FloatValue, temp: FloatValue, qvap: FloatValue) -> FloatValue {
    rho * RGAS_DRY * (1.0 + qvap / EPSILON) * temp
}

/// Saturation vapour pressure over liquid water (Tetens)
pub fn saturation_vapour_pressure_tetens(temp: FloatValue) -> FloatValue {
    TETENS_C1 * (TETENS_C3 * (temp - T0) / (temp - TETENS_C4)).exp()
}

/// Saturation specific humidity over water at constant density
///
/// Fails with [`MPhysError::Domain`] for non-positive density or a temperature at which the
/// Tetens formula degenerates.
pub fn saturation_specific_humidity_rho(
    temp: FloatValue,
    rho: FloatValue,
) -> MPhysResult<FloatValue> {
    if !(rho.is_finite() && rho > 0.0) {
        return Err(MPhysError::Domain(format!(
            "density must be positive, got {rho} kg/m^3"
        )));
    }
    if !(temp.is_finite() && temp > TETENS_C4) {
        return Err(MPhysError::Domain(format!(
            "temperature {temp} K is outside the range of the saturation formula"
        )));
    }
    let esat = saturation_vapour_pressure_tetens(temp);
    if !esat.is_finite() || esat <= 0.0 {
        return Err(MPhysError::Domain(format!(
            "saturation vapour pressure {esat} Pa is degenerate at T={temp} K"
        )));
    }
    Ok(esat / (rho * RGAS_VAP * temp))
}

/// Temperature derivative of [`saturation_specific_humidity_rho`] at constant density
pub fn dqsat_dtemp_rho(qsat: FloatValue, temp: FloatValue) -> FloatValue {
    let denom = temp - TETENS_C4;
    qsat * (TETENS_C3 * (T0 - TETENS_C4) / (denom * denom) - 1.0 / temp)
}
