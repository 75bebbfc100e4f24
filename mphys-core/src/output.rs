//! Time series of sampled thermodynamic states.
//!
//! An [`OutputRecorder`] holds one [`OutputVariable`] per tracked field.
//! Drivers append one sample per step with [`OutputRecorder::record`] and call
//! [`OutputRecorder::finalize`] once the run completes, after which every variable is backed
//! by a fixed `samples x cells` array and no more samples may be written.

use crate::constants::{CP_DRY, RGAS_DRY};
use crate::errors::{MPhysError, MPhysResult};
use crate::thermo::{MoistureCategory, ThermodynamicState};
use crate::{FloatValue, Time};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A named, unit-tagged sequence of samples.
///
/// Each sample holds `width` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputVariable {
    name: String,
    unit: String,
    width: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pending: Vec<FloatValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Array2<FloatValue>>,
}

impl OutputVariable {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            width,
            pending: Vec::new(),
            values: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Number of values in each sample.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of samples written so far.
    pub fn len(&self) -> usize {
        match &self.values {
            Some(values) => values.nrows(),
            None if self.width == 0 => 0,
            None => self.pending.len() / self.width,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finalized(&self) -> bool {
        self.values.is_some()
    }

    /// Append one sample.
    ///
    /// # Errors
    ///
    /// [`MPhysError::InvalidState`] if the variable is finalized or the sample has the
    /// wrong width.
    pub fn write(&mut self, sample: ArrayView1<FloatValue>) -> MPhysResult<()> {
        if self.is_finalized() {
            return Err(MPhysError::InvalidState(format!(
                "cannot write to {} after it has been finalized",
                self.name
            )));
        }
        if sample.len() != self.width {
            return Err(MPhysError::InvalidState(format!(
                "sample for {} has {} values, expected {}",
                self.name,
                sample.len(),
                self.width
            )));
        }
        self.pending.extend(sample.iter());
        Ok(())
    }

    /// Convert the samples into a fixed `samples x width` array.
    ///
    /// Finalizing twice is an error.
    pub fn finalize(&mut self) -> MPhysResult<()> {
        if self.is_finalized() {
            return Err(MPhysError::InvalidState(format!(
                "{} has already been finalized",
                self.name
            )));
        }
        let nsamples = self.len();
        let pending = std::mem::take(&mut self.pending);
        let values = Array2::from_shape_vec((nsamples, self.width), pending)
            .map_err(|e| MPhysError::InvalidState(format!("{}: {e}", self.name)))?;
        self.values = Some(values);
        Ok(())
    }

    /// The finalized array.
    ///
    /// # Errors
    ///
    /// [`MPhysError::InvalidState`] if the variable has not been finalized.
    pub fn values(&self) -> MPhysResult<ArrayView2<'_, FloatValue>> {
        self.values.as_ref().map(|v| v.view()).ok_or_else(|| {
            MPhysError::InvalidState(format!("{} has not been finalized", self.name))
        })
    }
}

/// Name of the time variable.
pub const TIME: &str = "time";
/// Name of the temperature variable.
pub const TEMPERATURE: &str = "temp";
/// Name of the density variable.
pub const DENSITY: &str = "rho";
/// Name of the pressure variable.
pub const PRESSURE: &str = "press";

/// Records time, temperature, density, pressure and the six mixing ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecorder {
    ncells: usize,
    variables: Vec<OutputVariable>,
}

impl OutputRecorder {
    /// Recorder for states with `ncells` cells.
    pub fn new(ncells: usize) -> Self {
        let mut variables = vec![
            OutputVariable::new(TIME, "s", 1),
            OutputVariable::new(TEMPERATURE, "K", ncells),
            OutputVariable::new(DENSITY, "kg/m^3", ncells),
            OutputVariable::new(PRESSURE, "Pa", ncells),
        ];
        variables.extend(
            MoistureCategory::ALL
                .iter()
                .map(|category| OutputVariable::new(category.short_name(), "kg/kg", ncells)),
        );
        Self { ncells, variables }
    }

    pub fn ncells(&self) -> usize {
        self.ncells
    }

    /// Number of samples recorded.
    pub fn len(&self) -> usize {
        self.variables[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finalized(&self) -> bool {
        self.variables.iter().all(|v| v.is_finalized())
    }

    /// Append the state at `time`.
    ///
    /// # Errors
    ///
    /// [`MPhysError::InvalidState`] if the recorder is finalized or the state has a different
    /// number of cells. Nothing is written on error.
    pub fn record(&mut self, time: Time, state: &ThermodynamicState) -> MPhysResult<()> {
        if self.is_finalized() {
            return Err(MPhysError::InvalidState(
                "cannot record after the output has been finalized".to_string(),
            ));
        }
        if state.ncells() != self.ncells {
            return Err(MPhysError::InvalidState(format!(
                "state has {} cells but the recorder expects {}",
                state.ncells(),
                self.ncells
            )));
        }

        let time = Array1::from_elem(1, time);
        let [qv, qc, qi, qr, qs, qg] = state.unpack_mixing_ratios();
        let samples = [
            time.view(),
            state.temperature(),
            state.density(),
            state.pressure(),
            qv.view(),
            qc.view(),
            qi.view(),
            qr.view(),
            qs.view(),
            qg.view(),
        ];
        for (variable, sample) in self.variables.iter_mut().zip(samples) {
            variable.write(sample)?;
        }
        Ok(())
    }

    /// Freeze every variable into its array form.
    pub fn finalize(&mut self) -> MPhysResult<()> {
        for variable in self.variables.iter_mut() {
            variable.finalize()?;
        }
        Ok(())
    }

    /// Look up a variable by name.
    pub fn get(&self, name: &str) -> Option<&OutputVariable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &OutputVariable> {
        self.variables.iter()
    }

    fn values(&self, name: &str) -> MPhysResult<ArrayView2<'_, FloatValue>> {
        self.get(name)
            .ok_or_else(|| MPhysError::InvalidState(format!("no output variable named {name}")))?
            .values()
    }

    /// The time axis of a finalized recorder.
    pub fn times(&self) -> MPhysResult<Array1<FloatValue>> {
        Ok(self.values(TIME)?.column(0).to_owned())
    }

    /// Finalized mixing ratios of one category.
    pub fn mixing_ratio(&self, category: MoistureCategory) -> MPhysResult<ArrayView2<'_, FloatValue>> {
        self.values(category.short_name())
    }

    /// Dry potential temperature of every sample.
    ///
    /// The reference pressure is the pressure of the first cell in the first sample.
    pub fn dry_potential_temperature(&self) -> MPhysResult<Array2<FloatValue>> {
        let temp = self.values(TEMPERATURE)?;
        let press = self.values(PRESSURE)?;
        let press_ref = *press.iter().next().ok_or_else(|| {
            MPhysError::InvalidState("no samples have been recorded".to_string())
        })?;

        let mut theta = temp.to_owned();
        theta.zip_mut_with(&press, |t, p| *t *= (press_ref / p).powf(RGAS_DRY / CP_DRY));
        Ok(theta)
    }

    /// The state of every cell at the last recorded sample, as `(name, values)` pairs.
    pub fn last_sample(&self) -> MPhysResult<Vec<(&str, Array1<FloatValue>)>> {
        self.variables
            .iter()
            .map(|v| {
                let values = v.values()?;
                let last = values.len_of(Axis(0)).checked_sub(1).ok_or_else(|| {
                    MPhysError::InvalidState("no samples have been recorded".to_string())
                })?;
                Ok((v.name(), values.row(last).to_owned()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermo::MixingRatios;
    use is_close::is_close;
    use ndarray::array;

    fn state(temp: FloatValue, press: FloatValue) -> ThermodynamicState {
        ThermodynamicState::parcel(temp, 1.2, press, [0.01, 0.002, 0.0, 0.0, 0.0, 0.0]).unwrap()
    }

    #[test]
    fn record_and_finalize() {
        let mut recorder = OutputRecorder::new(1);
        recorder.record(0.0, &state(290.0, 1e5)).unwrap();
        recorder.record(1.0, &state(289.0, 9.9e4)).unwrap();
        assert_eq!(recorder.len(), 2);

        // Values are only readable once finalized
        assert!(recorder.times().is_err());
        recorder.finalize().unwrap();

        assert_eq!(recorder.times().unwrap(), array![0.0, 1.0]);
        let temp = recorder.get("temp").unwrap();
        assert_eq!(temp.unit(), "K");
        assert_eq!(temp.values().unwrap(), array![[290.0], [289.0]]);
        assert_eq!(
            recorder.mixing_ratio(MoistureCategory::Cloud).unwrap(),
            array![[0.002], [0.002]]
        );
    }

    #[test]
    fn variable_names_and_units() {
        let recorder = OutputRecorder::new(3);
        let names: Vec<_> = recorder.variables().map(|v| (v.name(), v.unit())).collect();
        assert_eq!(
            names,
            vec![
                ("time", "s"),
                ("temp", "K"),
                ("rho", "kg/m^3"),
                ("press", "Pa"),
                ("qvap", "kg/kg"),
                ("qcond", "kg/kg"),
                ("qice", "kg/kg"),
                ("qrain", "kg/kg"),
                ("qsnow", "kg/kg"),
                ("qgrau", "kg/kg"),
            ]
        );
        assert_eq!(recorder.get("time").unwrap().width(), 1);
        assert_eq!(recorder.get("qvap").unwrap().width(), 3);
    }

    #[test]
    fn write_after_finalize_is_invalid() {
        let mut recorder = OutputRecorder::new(1);
        recorder.record(0.0, &state(290.0, 1e5)).unwrap();
        recorder.finalize().unwrap();

        let err = recorder.record(1.0, &state(290.0, 1e5)).unwrap_err();
        assert!(matches!(err, MPhysError::InvalidState(_)));

        let mut variable = OutputVariable::new("x", "1", 1);
        variable.finalize().unwrap();
        assert!(variable.write(array![1.0].view()).is_err());
        assert!(variable.finalize().is_err());
    }

    #[test]
    fn mismatched_cells_are_rejected() {
        let mut recorder = OutputRecorder::new(2);
        assert!(recorder.record(0.0, &state(290.0, 1e5)).is_err());
        assert!(recorder.is_empty());

        let column = ThermodynamicState::new(
            array![290.0, 280.0],
            array![1.2, 1.1],
            array![1e5, 9e4],
            MixingRatios::zeros(2),
        )
        .unwrap();
        recorder.record(0.0, &column).unwrap();
        recorder.finalize().unwrap();
        assert_eq!(recorder.get("press").unwrap().values().unwrap().dim(), (1, 2));
    }

    #[test]
    fn potential_temperature_uses_first_pressure() {
        let mut recorder = OutputRecorder::new(1);
        recorder.record(0.0, &state(290.0, 1e5)).unwrap();
        recorder.record(1.0, &state(280.0, 9e4)).unwrap();
        recorder.finalize().unwrap();

        let theta = recorder.dry_potential_temperature().unwrap();
        assert_eq!(theta[[0, 0]], 290.0);
        let expected = 280.0 * (1e5_f64 / 9e4).powf(RGAS_DRY / CP_DRY);
        assert!(is_close!(theta[[1, 0]], expected));
    }

    #[test]
    fn serialises_to_json() {
        let mut recorder = OutputRecorder::new(1);
        recorder.record(0.0, &state(290.0, 1e5)).unwrap();
        recorder.finalize().unwrap();

        let serialised = serde_json::to_string(&recorder).unwrap();
        let deserialised: OutputRecorder = serde_json::from_str(&serialised).unwrap();
        assert_eq!(deserialised, recorder);
    }

    #[test]
    fn last_sample() {
        let mut recorder = OutputRecorder::new(1);
        recorder.record(0.0, &state(290.0, 1e5)).unwrap();
        recorder.record(5.0, &state(285.0, 1e5)).unwrap();
        recorder.finalize().unwrap();

        let last = recorder.last_sample().unwrap();
        assert_eq!(last[0], ("time", array![5.0]));
        assert_eq!(last[1], ("temp", array![285.0]));
    }
}
