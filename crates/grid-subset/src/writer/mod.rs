//! Subset output writers.

mod netcdf_writer;

pub use netcdf_writer::{partial_path, SubsetWriter};
