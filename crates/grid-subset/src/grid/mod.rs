//! Grid descriptions and index-window computation.

mod descriptor;
mod indexer;
mod staggered;

pub use descriptor::{
    CurvilinearGrid, FamilyGrid, GridDescriptor, GridFamily, GridKind, GridVariable,
    RectangularGrid,
};
pub use indexer::GridIndexer;
pub use staggered::{derive_family_windows, family_window};

use goods_common::BoundingBox;

use crate::error::{Result, SubsetError};

/// A 2-D coordinate array stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateGrid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl CoordinateGrid {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        if rows * cols != values.len() {
            return Err(SubsetError::invalid_grid(format!(
                "{} values for a {}x{} grid",
                values.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, values })
    }

    /// Outer product of a 1-D axis along rows (`along_rows = true`) or columns.
    pub fn from_axis(axis: &[f64], other_len: usize, along_rows: bool) -> Self {
        let (rows, cols) = if along_rows {
            (axis.len(), other_len)
        } else {
            (other_len, axis.len())
        };
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                values.push(if along_rows { axis[r] } else { axis[c] });
            }
        }
        Self { rows, cols, values }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// NaN-ignoring `(min, max)` of a slice.
pub(crate) fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Bounding envelope of a grid from its latitude and longitude values.
pub(crate) fn envelope(lat: &[f64], lon: &[f64]) -> Result<BoundingBox> {
    let (south, north) = finite_range(lat)
        .ok_or_else(|| SubsetError::invalid_grid("latitude has no finite values"))?;
    let (west, east) = finite_range(lon)
        .ok_or_else(|| SubsetError::invalid_grid("longitude has no finite values"))?;
    Ok(BoundingBox::new(west, south, east, north))
}
