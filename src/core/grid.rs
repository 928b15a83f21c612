//! Sv grid container and the input checks shared by every mask generator.
//!
//! Grids are laid out as (samples x pings): row `i` is the i-th depth/range
//! sample counted from the transducer, column `j` is the j-th ping.

use ndarray::{Array2, ArrayD, ArrayView2, Ix2};
use thiserror::Error;

/// Errors raised when a grid or a generator parameter is malformed.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("grid is empty: {samples} samples x {pings} pings")]
    Empty { samples: usize, pings: usize },

    #[error("expected a 2-D grid, got {ndim} dimension(s)")]
    NotTwoDimensional { ndim: usize },

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("axes do not match grid: {depths} depths / {pings} ping labels for a {shape:?} grid")]
    AxesMismatch {
        depths: usize,
        pings: usize,
        shape: (usize, usize),
    },

    #[error("parameter '{name}' must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    #[error("invalid grid shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Physical axes attached to a grid by its reader.
///
/// Mask generators never look at these; they only travel with the data so
/// that exported masks line up with their source.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxes {
    /// Depth or range of each sample (one per row).
    pub depths: Vec<f64>,
    /// Label of each ping (one per column), usually a timestamp.
    pub pings: Vec<String>,
}

impl GridAxes {
    /// Axes that simply number samples and pings from zero.
    pub fn indexed(samples: usize, pings: usize) -> Self {
        Self {
            depths: (0..samples).map(|i| i as f64).collect(),
            pings: (0..pings).map(|j| j.to_string()).collect(),
        }
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.depths.len(), self.pings.len())
    }
}

/// A gridded Sv acquisition (dB re 1 m^-1).
#[derive(Debug, Clone)]
pub struct SvGrid {
    /// Sv values, shape (samples, pings).
    pub values: Array2<f64>,
    pub axes: GridAxes,
}

impl SvGrid {
    /// Wrap a value grid with index axes.
    pub fn new(values: Array2<f64>) -> Result<Self, GridError> {
        validate_grid(values.view())?;
        let (samples, pings) = values.dim();
        Ok(Self {
            values,
            axes: GridAxes::indexed(samples, pings),
        })
    }

    /// Wrap a value grid with reader-supplied axes.
    pub fn with_axes(values: Array2<f64>, axes: GridAxes) -> Result<Self, GridError> {
        validate_grid(values.view())?;
        check_axes(values.dim(), &axes)?;
        Ok(Self { values, axes })
    }

    /// Build a grid from sample rows, each holding one value per ping.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, GridError> {
        let samples = rows.len();
        let pings = rows.first().map_or(0, |row| row.len());
        if samples == 0 || pings == 0 {
            return Err(GridError::Empty { samples, pings });
        }

        let mut flat = Vec::with_capacity(samples * pings);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != pings {
                return Err(GridError::RaggedRow {
                    row,
                    expected: pings,
                    found: values.len(),
                });
            }
            flat.extend(values);
        }

        Self::new(Array2::from_shape_vec((samples, pings), flat)?)
    }

    /// Accept an array of unknown dimensionality, rejecting anything but 2-D.
    pub fn from_dyn(values: ArrayD<f64>) -> Result<Self, GridError> {
        let ndim = values.ndim();
        let values = values
            .into_dimensionality::<Ix2>()
            .map_err(|_| GridError::NotTwoDimensional { ndim })?;
        Self::new(values)
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.values.nrows()
    }

    #[inline]
    pub fn num_pings(&self) -> usize {
        self.values.ncols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}

/// Reject grids with no samples or no pings.
pub fn validate_grid<T>(grid: ArrayView2<'_, T>) -> Result<(), GridError> {
    let (samples, pings) = grid.dim();
    if samples == 0 || pings == 0 {
        return Err(GridError::Empty { samples, pings });
    }
    Ok(())
}

/// Reject NaN and infinite scalar parameters.
pub fn validate_parameter(name: &'static str, value: f64) -> Result<(), GridError> {
    if !value.is_finite() {
        return Err(GridError::NonFiniteParameter { name, value });
    }
    Ok(())
}

/// Fail unless two grids have identical dimensions.
pub fn check_same_shape(
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<(), GridError> {
    if expected != found {
        return Err(GridError::ShapeMismatch { expected, found });
    }
    Ok(())
}

pub(crate) fn check_axes(shape: (usize, usize), axes: &GridAxes) -> Result<(), GridError> {
    if axes.shape() != shape {
        return Err(GridError::AxesMismatch {
            depths: axes.depths.len(),
            pings: axes.pings.len(),
            shape,
        });
    }
    Ok(())
}
