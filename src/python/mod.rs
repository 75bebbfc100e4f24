//! Python bindings
//!
//! Exposes the thermodynamic state, the recorded output and both test cases, with schemes
//! selected by name.

use mphys_core::config::ColumnCaseConfig;
use mphys_core::drivers::run_0d_parcel as run_parcel;
use mphys_core::errors::MPhysError;
use mphys_core::output::OutputRecorder;
use mphys_core::parcel::SinusoidalParcelMotion;
use mphys_core::scheme::{GridSpec, MicrophysicsScheme};
use mphys_core::thermo::{MixingRatios, MoistureCategory, ThermodynamicState};
use mphys_core::FloatValue;
use mphys_schemes::{
    BulkCondensationScheme, MockScheme, NullScheme, OneMomentScheme, SaturationAdjustmentScheme,
    WarmRainEngine,
};
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

/// Thickness given to a parcel by engines that sediment
/// unit: m
const PARCEL_DEPTH: FloatValue = 100.0;

/// Cloud droplet number concentration used by the built-in engines
/// unit: m^-3
const CLOUD_DROPLET_NUMBER: FloatValue = 5e8;

fn to_py_err(err: MPhysError) -> PyErr {
    match err {
        MPhysError::Engine { .. } => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Build one of the built-in schemes for a grid.
fn scheme_by_name(name: &str, grid: GridSpec) -> PyResult<Box<dyn MicrophysicsScheme>> {
    let scheme: Box<dyn MicrophysicsScheme> = match name {
        "null" => Box::new(NullScheme),
        "mock" => Box::new(MockScheme::new(grid)),
        "condensation" => Box::new(BulkCondensationScheme::new()),
        "saturation_adjustment" => Box::new(SaturationAdjustmentScheme::new()),
        "warm_rain" => Box::new(
            OneMomentScheme::new(WarmRainEngine::new(), grid).map_err(to_py_err)?,
        ),
        _ => {
            return Err(PyValueError::new_err(format!(
                "Unknown scheme: {name}. Expected one of null, mock, condensation, \
                 saturation_adjustment, warm_rain"
            )))
        }
    };
    Ok(scheme)
}

/// Python wrapper for ThermodynamicState
///
/// Example:
///     state = ThermodynamicState.parcel(288.15, 1.225, 101325.0, [0.015, 0, 0, 0, 0, 0])
#[pyclass(name = "ThermodynamicState", module = "mphys")]
#[derive(Debug, Clone)]
pub struct PyThermodynamicState(pub ThermodynamicState);

#[pymethods]
impl PyThermodynamicState {
    /// Create a state from arrays of equal length.
    ///
    /// `mixing_ratios` holds six arrays: vapour, cloud, ice, rain, snow, graupel.
    #[new]
    fn new(
        temperature: PyReadonlyArray1<FloatValue>,
        density: PyReadonlyArray1<FloatValue>,
        pressure: PyReadonlyArray1<FloatValue>,
        mixing_ratios: Vec<PyReadonlyArray1<FloatValue>>,
    ) -> PyResult<Self> {
        let fields: [_; 6] = mixing_ratios
            .iter()
            .map(|q| q.as_array().to_owned())
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|fields: Vec<_>| {
                PyValueError::new_err(format!(
                    "Expected 6 mixing ratio arrays, got {}",
                    fields.len()
                ))
            })?;
        let mixing_ratios = MixingRatios::from_array(fields).map_err(to_py_err)?;
        let state = ThermodynamicState::new(
            temperature.as_array().to_owned(),
            density.as_array().to_owned(),
            pressure.as_array().to_owned(),
            mixing_ratios,
        )
        .map_err(to_py_err)?;
        Ok(Self(state))
    }

    /// Create a single-cell state
    #[staticmethod]
    fn parcel(
        temperature: FloatValue,
        density: FloatValue,
        pressure: FloatValue,
        mixing_ratios: [FloatValue; 6],
    ) -> PyResult<Self> {
        ThermodynamicState::parcel(temperature, density, pressure, mixing_ratios)
            .map(Self)
            .map_err(to_py_err)
    }

    #[getter]
    fn ncells(&self) -> usize {
        self.0.ncells()
    }

    #[getter]
    fn temperature<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.temperature().to_pyarray_bound(py)
    }

    #[getter]
    fn density<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.density().to_pyarray_bound(py)
    }

    #[getter]
    fn pressure<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.pressure().to_pyarray_bound(py)
    }

    /// The six mixing ratios in order: vapour, cloud, ice, rain, snow, graupel
    fn unpack_mixing_ratios<'py>(&self, py: Python<'py>) -> Vec<Bound<'py, PyArray1<FloatValue>>> {
        self.0
            .unpack_mixing_ratios()
            .iter()
            .map(|q| q.to_pyarray_bound(py))
            .collect()
    }

    fn __repr__(&self) -> String {
        format!("<ThermodynamicState ncells={}>", self.0.ncells())
    }
}

/// Python wrapper for a finalised OutputRecorder
#[pyclass(name = "OutputRecorder", module = "mphys")]
#[derive(Debug)]
pub struct PyOutputRecorder(pub OutputRecorder);

#[pymethods]
impl PyOutputRecorder {
    /// Names of the recorded variables
    fn names(&self) -> Vec<String> {
        self.0.variables().map(|v| v.name().to_string()).collect()
    }

    /// Unit of a recorded variable
    fn unit(&self, name: &str) -> PyResult<String> {
        self.0
            .get(name)
            .map(|v| v.unit().to_string())
            .ok_or_else(|| PyValueError::new_err(format!("Unknown variable: {name}")))
    }

    /// Values of a recorded variable with shape (samples, cells)
    fn get<'py>(&self, py: Python<'py>, name: &str) -> PyResult<Bound<'py, PyArray2<FloatValue>>> {
        let variable = self
            .0
            .get(name)
            .ok_or_else(|| PyValueError::new_err(format!("Unknown variable: {name}")))?;
        Ok(variable.values().map_err(to_py_err)?.to_pyarray_bound(py))
    }

    fn times<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray1<FloatValue>>> {
        Ok(self.0.times().map_err(to_py_err)?.to_pyarray_bound(py))
    }

    /// Mixing ratio by category index (0=vapour ... 5=graupel)
    fn mixing_ratio<'py>(
        &self,
        py: Python<'py>,
        index: usize,
    ) -> PyResult<Bound<'py, PyArray2<FloatValue>>> {
        let category = MoistureCategory::ALL.get(index).copied().ok_or_else(|| {
            PyValueError::new_err(format!("Invalid category index: {index}. Must be 0-5."))
        })?;
        Ok(self
            .0
            .mixing_ratio(category)
            .map_err(to_py_err)?
            .to_pyarray_bound(py))
    }

    fn dry_potential_temperature<'py>(
        &self,
        py: Python<'py>,
    ) -> PyResult<Bound<'py, PyArray2<FloatValue>>> {
        Ok(self
            .0
            .dry_potential_temperature()
            .map_err(to_py_err)?
            .to_pyarray_bound(py))
    }

    fn __len__(&self) -> usize {
        self.0.len()
    }
}

/// Run the 0-D parcel test case with a built-in scheme
#[pyfunction]
#[pyo3(signature = (time_init, time_end, timestep, thermo_init, scheme, amplitude=10000.0, period=10.0))]
fn run_0d_parcel(
    time_init: FloatValue,
    time_end: FloatValue,
    timestep: FloatValue,
    thermo_init: PyThermodynamicState,
    scheme: &str,
    amplitude: FloatValue,
    period: FloatValue,
) -> PyResult<PyOutputRecorder> {
    let grid = GridSpec::parcel(PARCEL_DEPTH, CLOUD_DROPLET_NUMBER).map_err(to_py_err)?;
    let mut scheme = scheme_by_name(scheme, grid)?;
    let mut motion = SinusoidalParcelMotion::new(amplitude, period).map_err(to_py_err)?;

    run_parcel(
        time_init,
        time_end,
        timestep,
        thermo_init.0,
        &mut motion,
        scheme.as_mut(),
    )
    .map(PyOutputRecorder)
    .map_err(to_py_err)
}

/// Run the 1-D KiD rainshaft with a built-in scheme
///
/// `config` is a TOML document in the format of the column case configuration.
#[pyfunction]
#[pyo3(signature = (scheme, config=""))]
fn run_1d_column(scheme: &str, config: &str) -> PyResult<PyOutputRecorder> {
    let config = ColumnCaseConfig::from_toml_str(config).map_err(to_py_err)?;
    let grid = config.grid().map_err(to_py_err)?;
    let spec = GridSpec::column(grid.nlevels(), grid.z_delta(), CLOUD_DROPLET_NUMBER)
        .map_err(to_py_err)?;
    let mut scheme = scheme_by_name(scheme, spec)?;

    config
        .run(scheme.as_mut())
        .map(PyOutputRecorder)
        .map_err(to_py_err)
}

#[pymodule]
#[pyo3(name = "_lib")]
fn mphys(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<PyThermodynamicState>()?;
    m.add_class::<PyOutputRecorder>()?;
    m.add_function(wrap_pyfunction!(run_0d_parcel, m)?)?;
    m.add_function(wrap_pyfunction!(run_1d_column, m)?)?;
    Ok(())
}
