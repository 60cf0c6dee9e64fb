//! Error types for dataset access.

use thiserror::Error;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors surfaced by a dataset source or sink.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open dataset '{dataset}': {message}")]
    OpenFailed { dataset: String, message: String },

    #[error("Variable '{variable}' not found in {dataset}")]
    VariableNotFound { dataset: String, variable: String },

    #[error("Failed to read '{variable}': {message}")]
    ReadFailed { variable: String, message: String },

    #[error("Failed to write '{target}': {message}")]
    WriteFailed { target: String, message: String },

    #[error("Invalid slice for '{variable}': {message}")]
    InvalidSlice { variable: String, message: String },

    #[error("Unsupported data type for '{variable}': {dtype}")]
    UnsupportedType { variable: String, dtype: String },
}

impl DatasetError {
    pub fn open_failed(dataset: impl Into<String>, message: impl ToString) -> Self {
        Self::OpenFailed {
            dataset: dataset.into(),
            message: message.to_string(),
        }
    }

    pub fn variable_not_found(dataset: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::VariableNotFound {
            dataset: dataset.into(),
            variable: variable.into(),
        }
    }

    pub fn read_failed(variable: impl Into<String>, message: impl ToString) -> Self {
        Self::ReadFailed {
            variable: variable.into(),
            message: message.to_string(),
        }
    }

    pub fn write_failed(target: impl Into<String>, message: impl ToString) -> Self {
        Self::WriteFailed {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_slice(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSlice {
            variable: variable.into(),
            message: message.into(),
        }
    }
}
