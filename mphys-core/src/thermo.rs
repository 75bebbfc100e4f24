//! Thermodynamic state exchanged between drivers, dynamics and microphysics schemes.
//!
//! A [`ThermodynamicState`] is a snapshot of one parcel (a single cell) or one column
//! (many cells) at one instant.
//! Every array in a state shares a common cell count; the constructors validate this and
//! mutable access only hands out length-preserving views so the invariant cannot be broken
//! afterwards.
//!
//! The six moisture categories live in a [`MixingRatios`] container indexed by
//! [`MoistureCategory`] rather than by position, so that categories cannot be silently reordered.
//!
//! # Examples
//!
//! ```rust
//! use mphys_core::thermo::{MoistureCategory, ThermodynamicState};
//!
//! let state = ThermodynamicState::parcel(288.15, 1.225, 101325.0, [0.015, 0.0, 0.0, 0.0, 0.0, 0.0])
//!     .unwrap();
//!
//! assert_eq!(state.ncells(), 1);
//! assert_eq!(state.mixing_ratios()[MoistureCategory::Vapour][0], 0.015);
//! ```

use crate::errors::{MPhysError, MPhysResult};
use crate::FloatValue;
use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};

/// The six moisture categories, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoistureCategory {
    /// Water vapour
    Vapour = 0,
    /// Cloud liquid
    Cloud = 1,
    /// Cloud ice
    Ice = 2,
    /// Rain
    Rain = 3,
    /// Snow
    Snow = 4,
    /// Graupel
    Graupel = 5,
}

impl MoistureCategory {
    /// All categories in storage order: `[vapour, cloud, ice, rain, snow, graupel]`.
    pub const ALL: [MoistureCategory; 6] = [
        MoistureCategory::Vapour,
        MoistureCategory::Cloud,
        MoistureCategory::Ice,
        MoistureCategory::Rain,
        MoistureCategory::Snow,
        MoistureCategory::Graupel,
    ];

    /// Short name used for output variables.
    pub fn short_name(&self) -> &'static str {
        match self {
            MoistureCategory::Vapour => "qvap",
            MoistureCategory::Cloud => "qcond",
            MoistureCategory::Ice => "qice",
            MoistureCategory::Rain => "qrain",
            MoistureCategory::Snow => "qsnow",
            MoistureCategory::Graupel => "qgrau",
        }
    }

    /// Whether this is a frozen category.
    pub fn is_frozen(&self) -> bool {
        matches!(
            self,
            MoistureCategory::Ice | MoistureCategory::Snow | MoistureCategory::Graupel
        )
    }
}

impl std::fmt::Display for MoistureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// Mass mixing ratios of vapour and condensates (kg/kg), one array per [`MoistureCategory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixingRatios([Array1<FloatValue>; 6]);

impl MixingRatios {
    /// Create from the six arrays in their fixed order.
    ///
    /// Fails if the arrays do not share a common length.
    pub fn new(
        qvap: Array1<FloatValue>,
        qcond: Array1<FloatValue>,
        qice: Array1<FloatValue>,
        qrain: Array1<FloatValue>,
        qsnow: Array1<FloatValue>,
        qgrau: Array1<FloatValue>,
    ) -> MPhysResult<Self> {
        Self::from_array([qvap, qcond, qice, qrain, qsnow, qgrau])
    }

    /// Create from an array of six fields.
    ///
    /// Order: [vapour, cloud, ice, rain, snow, graupel]
    pub fn from_array(values: [Array1<FloatValue>; 6]) -> MPhysResult<Self> {
        let ncells = values[0].len();
        for (category, field) in MoistureCategory::ALL.iter().zip(values.iter()) {
            if field.len() != ncells {
                return Err(MPhysError::InvalidState(format!(
                    "mixing ratio {} has {} cells, expected {}",
                    category,
                    field.len(),
                    ncells
                )));
            }
        }
        Ok(Self(values))
    }

    /// All categories zero over `ncells` cells.
    pub fn zeros(ncells: usize) -> Self {
        Self(std::array::from_fn(|_| Array1::zeros(ncells)))
    }

    /// Single-cell mixing ratios from six scalars.
    pub fn from_scalars(values: [FloatValue; 6]) -> Self {
        Self(values.map(|v| Array1::from_elem(1, v)))
    }

    /// Number of cells in each field.
    pub fn ncells(&self) -> usize {
        self.0[0].len()
    }

    /// Get a category's field.
    pub fn get(&self, category: MoistureCategory) -> &Array1<FloatValue> {
        &self.0[category as usize]
    }

    /// Get a length-preserving mutable view of a category's field.
    pub fn view_mut(&mut self, category: MoistureCategory) -> ArrayViewMut1<'_, FloatValue> {
        self.0[category as usize].view_mut()
    }

    /// Replace a category's field.
    ///
    /// Fails if the new field does not have the current number of cells.
    pub fn set(&mut self, category: MoistureCategory, values: Array1<FloatValue>) -> MPhysResult<()> {
        if values.len() != self.ncells() {
            return Err(MPhysError::InvalidState(format!(
                "cannot set {} with {} cells, expected {}",
                category,
                values.len(),
                self.ncells()
            )));
        }
        self.0[category as usize] = values;
        Ok(())
    }

    /// The six fields in fixed order: `[vapour, cloud, ice, rain, snow, graupel]`.
    pub fn unpack(&self) -> [&Array1<FloatValue>; 6] {
        self.0.each_ref()
    }

    /// Simultaneous mutable views of all six fields, in fixed order.
    pub fn views_mut(&mut self) -> [ArrayViewMut1<'_, FloatValue>; 6] {
        self.0.each_mut().map(|field| field.view_mut())
    }

    /// Iterate over `(category, field)` pairs in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (MoistureCategory, &Array1<FloatValue>)> {
        MoistureCategory::ALL.into_iter().zip(self.0.iter())
    }

    /// Sum of all condensate categories (everything except vapour) per cell.
    pub fn total_condensate(&self) -> Array1<FloatValue> {
        self.0[1..]
            .iter()
            .fold(Array1::zeros(self.ncells()), |acc, field| acc + field)
    }

    /// Total water (vapour plus condensate) per cell.
    pub fn total_water(&self) -> Array1<FloatValue> {
        self.total_condensate() + &self.0[0]
    }

    /// Values of all six categories in one cell.
    pub fn cell(&self, index: usize) -> [FloatValue; 6] {
        std::array::from_fn(|i| self.0[i][index])
    }

    /// Overwrite all six categories in one cell.
    pub fn set_cell(&mut self, index: usize, values: [FloatValue; 6]) {
        for (field, value) in self.0.iter_mut().zip(values) {
            field[index] = value;
        }
    }
}

impl std::ops::Index<MoistureCategory> for MixingRatios {
    type Output = Array1<FloatValue>;

    fn index(&self, category: MoistureCategory) -> &Self::Output {
        &self.0[category as usize]
    }
}

/// Wind components (m/s) for schemes that transport their own particles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winds {
    pub vertical: Array1<FloatValue>,
    pub zonal: Array1<FloatValue>,
    pub meridional: Array1<FloatValue>,
}

impl Winds {
    /// Fails if the three components do not share a common length.
    pub fn new(
        vertical: Array1<FloatValue>,
        zonal: Array1<FloatValue>,
        meridional: Array1<FloatValue>,
    ) -> MPhysResult<Self> {
        if zonal.len() != vertical.len() || meridional.len() != vertical.len() {
            return Err(MPhysError::InvalidState(format!(
                "wind components have inconsistent lengths: w={}, u={}, v={}",
                vertical.len(),
                zonal.len(),
                meridional.len()
            )));
        }
        Ok(Self {
            vertical,
            zonal,
            meridional,
        })
    }

    /// Calm winds over `ncells` cells.
    pub fn zeros(ncells: usize) -> Self {
        Self {
            vertical: Array1::zeros(ncells),
            zonal: Array1::zeros(ncells),
            meridional: Array1::zeros(ncells),
        }
    }

    pub fn ncells(&self) -> usize {
        self.vertical.len()
    }
}

/// Scalar values of a single cell of a [`ThermodynamicState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellState {
    pub temperature: FloatValue,
    pub density: FloatValue,
    pub pressure: FloatValue,
    /// Order: [vapour, cloud, ice, rain, snow, graupel]
    pub mixing_ratios: [FloatValue; 6],
}

impl CellState {
    pub fn q(&self, category: MoistureCategory) -> FloatValue {
        self.mixing_ratios[category as usize]
    }

    pub fn q_mut(&mut self, category: MoistureCategory) -> &mut FloatValue {
        &mut self.mixing_ratios[category as usize]
    }
}

/// Thermodynamic state of a parcel or column at one instant.
///
/// Temperature (K), density of moist air (kg/m^3), pressure (Pa), six moisture mass mixing
/// ratios (kg/kg) and optionally winds (m/s).
/// A 0-D parcel has one cell.
/// A column of `nvec` columns with `nlevels` levels has `nvec * nlevels` cells stored
/// column by column, bottom level first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermodynamicState {
    temperature: Array1<FloatValue>,
    density: Array1<FloatValue>,
    pressure: Array1<FloatValue>,
    mixing_ratios: MixingRatios,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    winds: Option<Winds>,
}

impl ThermodynamicState {
    /// Create a new state.
    ///
    /// Fails with [`MPhysError::InvalidState`] if the arrays have inconsistent lengths.
    pub fn new(
        temperature: Array1<FloatValue>,
        density: Array1<FloatValue>,
        pressure: Array1<FloatValue>,
        mixing_ratios: MixingRatios,
    ) -> MPhysResult<Self> {
        let ncells = temperature.len();
        let check = |name: &str, len: usize| {
            if len == ncells {
                Ok(())
            } else {
                Err(MPhysError::InvalidState(format!(
                    "{name} has {len} cells but temperature has {ncells}"
                )))
            }
        };
        check("density", density.len())?;
        check("pressure", pressure.len())?;
        check("mixing ratios", mixing_ratios.ncells())?;

        Ok(Self {
            temperature,
            density,
            pressure,
            mixing_ratios,
            winds: None,
        })
    }

    /// Single-cell (0-D parcel) state from scalars.
    ///
    /// Mixing ratio order: [vapour, cloud, ice, rain, snow, graupel]
    pub fn parcel(
        temperature: FloatValue,
        density: FloatValue,
        pressure: FloatValue,
        mixing_ratios: [FloatValue; 6],
    ) -> MPhysResult<Self> {
        Self::new(
            Array1::from_elem(1, temperature),
            Array1::from_elem(1, density),
            Array1::from_elem(1, pressure),
            MixingRatios::from_scalars(mixing_ratios),
        )
    }

    /// Attach wind fields to the state.
    pub fn with_winds(mut self, winds: Winds) -> MPhysResult<Self> {
        if winds.ncells() != self.ncells() {
            return Err(MPhysError::InvalidState(format!(
                "winds have {} cells but state has {}",
                winds.ncells(),
                self.ncells()
            )));
        }
        self.winds = Some(winds);
        Ok(self)
    }

    /// Number of cells shared by every array in the state.
    pub fn ncells(&self) -> usize {
        self.temperature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ncells() == 0
    }

    pub fn temperature(&self) -> ArrayView1<'_, FloatValue> {
        self.temperature.view()
    }

    pub fn density(&self) -> ArrayView1<'_, FloatValue> {
        self.density.view()
    }

    pub fn pressure(&self) -> ArrayView1<'_, FloatValue> {
        self.pressure.view()
    }

    pub fn temperature_mut(&mut self) -> ArrayViewMut1<'_, FloatValue> {
        self.temperature.view_mut()
    }

    pub fn density_mut(&mut self) -> ArrayViewMut1<'_, FloatValue> {
        self.density.view_mut()
    }

    pub fn pressure_mut(&mut self) -> ArrayViewMut1<'_, FloatValue> {
        self.pressure.view_mut()
    }

    pub fn mixing_ratios(&self) -> &MixingRatios {
        &self.mixing_ratios
    }

    pub fn mixing_ratios_mut(&mut self) -> &mut MixingRatios {
        &mut self.mixing_ratios
    }

    /// The six mixing ratio fields in fixed order: `[vapour, cloud, ice, rain, snow, graupel]`.
    pub fn unpack_mixing_ratios(&self) -> [&Array1<FloatValue>; 6] {
        self.mixing_ratios.unpack()
    }

    pub fn winds(&self) -> Option<&Winds> {
        self.winds.as_ref()
    }

    /// Replace the temperature field, keeping the cell count.
    pub fn set_temperature(&mut self, values: Array1<FloatValue>) -> MPhysResult<()> {
        Self::check_len("temperature", &values, self.ncells())?;
        self.temperature = values;
        Ok(())
    }

    /// Replace the density field, keeping the cell count.
    pub fn set_density(&mut self, values: Array1<FloatValue>) -> MPhysResult<()> {
        Self::check_len("density", &values, self.ncells())?;
        self.density = values;
        Ok(())
    }

    /// Replace the pressure field, keeping the cell count.
    pub fn set_pressure(&mut self, values: Array1<FloatValue>) -> MPhysResult<()> {
        Self::check_len("pressure", &values, self.ncells())?;
        self.pressure = values;
        Ok(())
    }

    fn check_len(name: &str, values: &Array1<FloatValue>, ncells: usize) -> MPhysResult<()> {
        if values.len() != ncells {
            return Err(MPhysError::InvalidState(format!(
                "cannot set {name} with {} cells, expected {ncells}",
                values.len()
            )));
        }
        Ok(())
    }

    /// Scalar values of one cell.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn cell(&self, index: usize) -> CellState {
        CellState {
            temperature: self.temperature[index],
            density: self.density[index],
            pressure: self.pressure[index],
            mixing_ratios: self.mixing_ratios.cell(index),
        }
    }

    /// Overwrite one cell's values.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn set_cell(&mut self, index: usize, cell: &CellState) {
        self.temperature[index] = cell.temperature;
        self.density[index] = cell.density;
        self.pressure[index] = cell.pressure;
        self.mixing_ratios.set_cell(index, cell.mixing_ratios);
    }

    /// Fails with [`MPhysError::Domain`] if any cell has a non-positive or non-finite
    /// temperature, density or pressure.
    ///
    /// Schemes that need a physically meaningful state call this before computing.
    pub fn check_physical(&self) -> MPhysResult<()> {
        if self.is_empty() {
            return Err(MPhysError::Domain("state has no cells".to_string()));
        }
        for (name, field) in [
            ("temperature", &self.temperature),
            ("density", &self.density),
            ("pressure", &self.pressure),
        ] {
            if let Some((index, value)) = field
                .iter()
                .enumerate()
                .find(|(_, v)| !(v.is_finite() && **v > 0.0))
            {
                return Err(MPhysError::Domain(format!(
                    "{name} must be positive and finite, got {value} in cell {index}"
                )));
            }
        }
        Ok(())
    }
}
