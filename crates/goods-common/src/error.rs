//! Error types for coordinate validation and region handling.

use std::fmt;

use thiserror::Error;

/// Result type alias using CoordinateError.
pub type CoordinateResult<T> = Result<T, CoordinateError>;

/// Coordinate axis a range error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// Errors raised while validating or canonicalizing a query region.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    /// A latitude or longitude value outside its accepted range.
    #[error("{axis} value {value} is out of range ({expected})")]
    Range {
        axis: Axis,
        value: f64,
        expected: &'static str,
    },

    /// Malformed region input (too few points, non-numeric pair, ...).
    #[error("Malformed region: {0}")]
    Shape(String),

    /// A ring that does not describe an axis-aligned rectangle.
    #[error("Region is not an axis-aligned rectangle: {0}")]
    NonRectangular(String),
}

impl CoordinateError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub fn non_rectangular(msg: impl Into<String>) -> Self {
        Self::NonRectangular(msg.into())
    }
}
