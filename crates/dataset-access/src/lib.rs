//! Access to gridded model datasets.
//!
//! The subsetting core only needs named-variable lookup and partial,
//! strided reads. [`DatasetSource`] captures that contract; [`NetcdfSource`]
//! implements it over libnetcdf (local files and OPeNDAP URLs) and
//! [`MemoryDataset`] over in-memory arrays.

pub mod error;
pub mod memory;
pub mod native;
pub mod slice;
pub mod types;

pub use error::{DatasetError, DatasetResult};
pub use memory::MemoryDataset;
pub use native::{silence_hdf5_errors, NetcdfSink, NetcdfSource};
pub use slice::AxisSlice;
pub use types::{ArrayData, AttributeValue, DataType, VariableInfo};

/// A dataset handle supporting variable lookup and hyperslab reads.
///
/// Implementations must only materialize the requested index ranges.
pub trait DatasetSource {
    /// Stable identifier (path or URL) used for logging and cache keys.
    fn identifier(&self) -> &str;

    fn variable_names(&self) -> Vec<String>;

    fn variable(&self, name: &str) -> Option<VariableInfo>;

    fn dimension_len(&self, name: &str) -> Option<usize>;

    fn global_attributes(&self) -> Vec<(String, AttributeValue)>;

    /// Read a hyperslab. `slices` must have one entry per variable dimension.
    fn read(&self, name: &str, slices: &[AxisSlice]) -> DatasetResult<ArrayData>;

    fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Look up a variable, failing when it does not exist.
    fn require_variable(&self, name: &str) -> DatasetResult<VariableInfo> {
        self.variable(name)
            .ok_or_else(|| DatasetError::variable_not_found(self.identifier(), name))
    }

    /// Read a variable in full.
    fn read_all(&self, name: &str) -> DatasetResult<ArrayData> {
        let info = self.require_variable(name)?;
        let slices: Vec<AxisSlice> = info.shape.iter().map(|&n| AxisSlice::full(n)).collect();
        self.read(name, &slices)
    }
}
