//! Error types for grid subsetting.

use dataset_access::DatasetError;
use goods_common::{CoordinateError, TimeParseError};
use thiserror::Error;

/// Errors that can occur while planning or writing a subset.
///
/// None of these are retried; any error means no output file was produced.
#[derive(Error, Debug)]
pub enum SubsetError {
    /// Invalid latitude/longitude value or malformed region input.
    #[error(transparent)]
    Coordinate(CoordinateError),

    /// The requested region lies outside the grid domain.
    #[error("region {requested} does not intersect grid envelope {grid}")]
    EmptyIntersection { requested: String, grid: String },

    /// No time steps fall inside the requested window.
    #[error("no time steps between {start} and {end}")]
    EmptyTimeRange { start: String, end: String },

    /// A variable could not be mapped to a grid point family.
    #[error("cannot determine grid point family for variable '{variable}'")]
    UnresolvedGridFamily { variable: String },

    /// Only axis-aligned rectangular regions are supported.
    #[error("incompatible bounds: {0}")]
    IncompatibleBounds(String),

    /// A mapped variable does not exist in the dataset.
    #[error("variable '{variable}' not found in {dataset}")]
    VariableNotFound { variable: String, dataset: String },

    /// Failure surfaced by the dataset access layer.
    #[error("source I/O error: {0}")]
    SourceIo(#[source] DatasetError),

    /// An index window violates `0 <= start < end <= extent`, `stride >= 1`.
    #[error("invalid index window: {0}")]
    InvalidWindow(String),

    /// Grid coordinate arrays are inconsistent.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// The time coordinate could not be decoded.
    #[error("time units error: {0}")]
    TimeUnits(#[from] TimeParseError),

    /// The estimated output exceeds the configured size limit.
    #[error("estimated subset size {estimated_mb:.1} MB exceeds limit of {limit_mb} MB")]
    SubsetTooLarge { estimated_mb: f64, limit_mb: u64 },

    /// Unknown model identifier.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local filesystem error while finalizing output.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubsetError {
    pub fn invalid_window(msg: impl Into<String>) -> Self {
        Self::InvalidWindow(msg.into())
    }

    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn variable_not_found(variable: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self::VariableNotFound {
            variable: variable.into(),
            dataset: dataset.into(),
        }
    }

    pub fn unresolved_family(variable: impl Into<String>) -> Self {
        Self::UnresolvedGridFamily {
            variable: variable.into(),
        }
    }
}

impl From<CoordinateError> for SubsetError {
    fn from(err: CoordinateError) -> Self {
        match err {
            CoordinateError::NonRectangular(msg) => Self::IncompatibleBounds(msg),
            other => Self::Coordinate(other),
        }
    }
}

impl From<DatasetError> for SubsetError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::VariableNotFound { dataset, variable } => {
                Self::VariableNotFound { variable, dataset }
            }
            other => Self::SourceIo(other),
        }
    }
}

/// Result type for subsetting operations.
pub type Result<T> = std::result::Result<T, SubsetError>;
