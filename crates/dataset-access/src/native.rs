//! Native NetCDF access using the netcdf library.
//!
//! [`NetcdfSource`] reads local files and, when libnetcdf is built with DAP
//! support, OPeNDAP URLs. Strided selections are passed through to libnetcdf
//! as strided hyperslabs, so only the selected elements are transferred.
//!
//! [`NetcdfSink`] is the write side used for subset output.

use std::ops::Range;
use std::path::Path;
use std::sync::Once;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::{Extent, NcTypeDescriptor};
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};
use crate::slice::{check_slices, AxisSlice};
use crate::types::{ArrayData, AttributeValue, DataType, VariableInfo};
use crate::DatasetSource;

/// Attributes maintained by the library itself; never copied into output.
const RESERVED_ATTRIBUTES: &[&str] = &[
    "_NCProperties",
    "_Netcdf4Dimid",
    "_Netcdf4Coordinates",
    "_IsNetcdf4",
    "_SuperblockVersion",
    "_Format",
];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// This function disables that output by calling H5Eset_auto2 with null handlers.
/// It only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

// =============================================================================
// Source
// =============================================================================

/// A netCDF dataset opened for reading.
pub struct NetcdfSource {
    file: netcdf::File,
    identifier: String,
}

impl std::fmt::Debug for NetcdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetcdfSource")
            .field("identifier", &self.identifier)
            .finish()
    }
}

impl NetcdfSource {
    /// Open a local path or an OPeNDAP URL.
    pub fn open(location: &str) -> DatasetResult<Self> {
        silence_hdf5_errors();

        debug!(location = %location, "Opening dataset");
        let file =
            netcdf::open(location).map_err(|e| DatasetError::open_failed(location, e))?;
        Ok(Self {
            file,
            identifier: location.to_string(),
        })
    }

    pub fn open_path(path: &Path) -> DatasetResult<Self> {
        Self::open(&path.to_string_lossy())
    }

    fn nc_variable(&self, name: &str) -> DatasetResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| DatasetError::variable_not_found(&self.identifier, name))
    }
}

impl DatasetSource for NetcdfSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name()).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        let var = self.file.variable(name)?;
        let data_type = match data_type_of(&var.vartype()) {
            Some(dt) => dt,
            None => {
                debug!(variable = %name, vartype = ?var.vartype(), "Skipping variable with unsupported type");
                return None;
            }
        };
        Some(VariableInfo {
            name: var.name(),
            dimensions: var.dimensions().iter().map(|d| d.name()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            data_type,
            attributes: var
                .attributes()
                .filter_map(|attr| {
                    let value = attr.value().ok()?;
                    from_nc_attribute(value).map(|v| (attr.name().to_string(), v))
                })
                .collect(),
        })
    }

    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.file.dimension(name).map(|d| d.len())
    }

    fn global_attributes(&self) -> Vec<(String, AttributeValue)> {
        self.file
            .attributes()
            .filter_map(|attr| {
                let value = attr.value().ok()?;
                from_nc_attribute(value).map(|v| (attr.name().to_string(), v))
            })
            .collect()
    }

    fn read(&self, name: &str, slices: &[AxisSlice]) -> DatasetResult<ArrayData> {
        let var = self.nc_variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        check_slices(&shape, slices).map_err(|msg| DatasetError::invalid_slice(name, msg))?;

        let data = match var.vartype() {
            NcVariableType::Int(IntType::I8) => ArrayData::I8(get_strided(&var, name, slices)?),
            NcVariableType::Int(IntType::U8) => ArrayData::U8(get_strided(&var, name, slices)?),
            NcVariableType::Int(IntType::I16) => ArrayData::I16(get_strided(&var, name, slices)?),
            NcVariableType::Int(IntType::U16) | NcVariableType::Int(IntType::I32) => {
                ArrayData::I32(get_strided(&var, name, slices)?)
            }
            NcVariableType::Int(_) => ArrayData::I64(get_strided(&var, name, slices)?),
            NcVariableType::Float(FloatType::F32) => {
                ArrayData::F32(get_strided(&var, name, slices)?)
            }
            NcVariableType::Float(FloatType::F64) => {
                ArrayData::F64(get_strided(&var, name, slices)?)
            }
            other => {
                return Err(DatasetError::UnsupportedType {
                    variable: name.to_string(),
                    dtype: format!("{:?}", other),
                })
            }
        };
        Ok(data)
    }
}

// =============================================================================
// Sink
// =============================================================================

/// A netCDF-4 file opened for writing.
pub struct NetcdfSink {
    file: netcdf::FileMut,
    target: String,
}

impl NetcdfSink {
    /// Create (or truncate) a netCDF-4 file.
    pub fn create(path: &Path) -> DatasetResult<Self> {
        silence_hdf5_errors();

        let target = path.display().to_string();
        let file = netcdf::create(path).map_err(|e| DatasetError::write_failed(&target, e))?;
        Ok(Self { file, target })
    }

    pub fn add_dimension(&mut self, name: &str, len: usize) -> DatasetResult<()> {
        self.file
            .add_dimension(name, len)
            .map_err(|e| DatasetError::write_failed(name, e))?;
        Ok(())
    }

    pub fn add_unlimited_dimension(&mut self, name: &str) -> DatasetResult<()> {
        self.file
            .add_unlimited_dimension(name)
            .map_err(|e| DatasetError::write_failed(name, e))?;
        Ok(())
    }

    pub fn add_global_attribute(&mut self, name: &str, value: &AttributeValue) -> DatasetResult<()> {
        if RESERVED_ATTRIBUTES.contains(&name) {
            return Ok(());
        }
        self.file
            .add_attribute(name, to_nc_attribute(value))
            .map_err(|e| DatasetError::write_failed(format!("{}:{}", self.target, name), e))?;
        Ok(())
    }

    /// Define a variable and its attributes.
    ///
    /// `_FillValue` is coerced to the variable's own type, which netCDF-4 requires.
    pub fn define_variable(
        &mut self,
        name: &str,
        data_type: DataType,
        dimensions: &[&str],
        attributes: &[(String, AttributeValue)],
    ) -> DatasetResult<()> {
        let mut var = match data_type {
            DataType::I8 => self.file.add_variable::<i8>(name, dimensions),
            DataType::U8 => self.file.add_variable::<u8>(name, dimensions),
            DataType::I16 => self.file.add_variable::<i16>(name, dimensions),
            DataType::I32 => self.file.add_variable::<i32>(name, dimensions),
            DataType::I64 => self.file.add_variable::<i64>(name, dimensions),
            DataType::F32 => self.file.add_variable::<f32>(name, dimensions),
            DataType::F64 => self.file.add_variable::<f64>(name, dimensions),
        }
        .map_err(|e| DatasetError::write_failed(name, e))?;

        for (attr_name, value) in attributes {
            if RESERVED_ATTRIBUTES.contains(&attr_name.as_str()) {
                continue;
            }
            let value = if attr_name == "_FillValue" {
                match coerce_scalar(value, data_type) {
                    Some(v) => v,
                    None => {
                        debug!(variable = %name, "Dropping non-numeric _FillValue");
                        continue;
                    }
                }
            } else {
                value.clone()
            };
            var.put_attribute(attr_name, to_nc_attribute(&value))
                .map_err(|e| DatasetError::write_failed(format!("{}:{}", name, attr_name), e))?;
        }
        Ok(())
    }

    /// Write the full extent of a variable. `shape` is the output shape.
    pub fn put(&mut self, name: &str, data: &ArrayData, shape: &[usize]) -> DatasetResult<()> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(DatasetError::write_failed(
                name,
                format!("{} values for shape {:?}", data.len(), shape),
            ));
        }

        let mut var = self
            .file
            .variable_mut(name)
            .ok_or_else(|| DatasetError::variable_not_found(&self.target, name))?;
        let ranges: Vec<Range<usize>> = shape.iter().map(|&n| 0..n).collect();

        match data {
            ArrayData::I8(v) => put_ranged(&mut var, name, v, &ranges),
            ArrayData::U8(v) => put_ranged(&mut var, name, v, &ranges),
            ArrayData::I16(v) => put_ranged(&mut var, name, v, &ranges),
            ArrayData::I32(v) => put_ranged(&mut var, name, v, &ranges),
            ArrayData::I64(v) => put_ranged(&mut var, name, v, &ranges),
            ArrayData::F32(v) => put_ranged(&mut var, name, v, &ranges),
            ArrayData::F64(v) => put_ranged(&mut var, name, v, &ranges),
        }
    }

    /// Flush and close the file.
    pub fn close(self) -> DatasetResult<()> {
        let Self { file, target } = self;
        debug!(path = %target, "Closing output file");
        file.close().map_err(|e| DatasetError::write_failed(target, e))
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn data_type_of(vartype: &NcVariableType) -> Option<DataType> {
    match vartype {
        NcVariableType::Int(IntType::I8) => Some(DataType::I8),
        NcVariableType::Int(IntType::U8) => Some(DataType::U8),
        NcVariableType::Int(IntType::I16) => Some(DataType::I16),
        NcVariableType::Int(IntType::U16) | NcVariableType::Int(IntType::I32) => {
            Some(DataType::I32)
        }
        NcVariableType::Int(_) => Some(DataType::I64),
        NcVariableType::Float(FloatType::F32) => Some(DataType::F32),
        NcVariableType::Float(FloatType::F64) => Some(DataType::F64),
        _ => None,
    }
}

fn get_strided<T: NcTypeDescriptor + Copy>(
    var: &netcdf::Variable,
    name: &str,
    slices: &[AxisSlice],
) -> DatasetResult<Vec<T>> {
    let result = if slices.is_empty() {
        var.get_values::<T, _>(..)
    } else {
        let extents: Vec<Extent> = slices
            .iter()
            .map(|s| Extent::from((s.start..s.end).step_by(s.stride)))
            .collect();
        var.get_values::<T, _>(extents)
    };
    result.map_err(|e| DatasetError::read_failed(name, e))
}

fn put_ranged<T: NcTypeDescriptor>(
    var: &mut netcdf::VariableMut,
    name: &str,
    values: &[T],
    r: &[Range<usize>],
) -> DatasetResult<()> {
    let result = match r {
        [] => var.put_values(values, ..),
        [a] => var.put_values(values, a.clone()),
        [a, b] => var.put_values(values, (a.clone(), b.clone())),
        [a, b, c] => var.put_values(values, (a.clone(), b.clone(), c.clone())),
        [a, b, c, d] => var.put_values(values, (a.clone(), b.clone(), c.clone(), d.clone())),
        _ => {
            return Err(DatasetError::write_failed(
                name,
                format!("unsupported rank {} (max 4)", r.len()),
            ))
        }
    };
    result.map_err(|e| DatasetError::write_failed(name, e))
}

fn coerce_scalar(value: &AttributeValue, data_type: DataType) -> Option<AttributeValue> {
    let v = value.as_f64()?;
    Some(match data_type {
        DataType::I8 => AttributeValue::Byte(v as i8),
        DataType::U8 => AttributeValue::UByte(v as u8),
        DataType::I16 => AttributeValue::Short(v as i16),
        DataType::I32 => AttributeValue::Int(v as i32),
        DataType::I64 => AttributeValue::Long(v as i64),
        DataType::F32 => AttributeValue::Float(v as f32),
        DataType::F64 => AttributeValue::Double(v),
    })
}

fn from_nc_attribute(value: netcdf::AttributeValue) -> Option<AttributeValue> {
    use netcdf::AttributeValue as Nc;

    Some(match value {
        Nc::Str(s) => AttributeValue::Str(s),
        Nc::Strs(s) => AttributeValue::Strs(s),
        Nc::Schar(v) => AttributeValue::Byte(v),
        Nc::Schars(v) => AttributeValue::Bytes(v),
        Nc::Uchar(v) => AttributeValue::UByte(v),
        Nc::Uchars(v) => AttributeValue::UBytes(v),
        Nc::Short(v) => AttributeValue::Short(v),
        Nc::Shorts(v) => AttributeValue::Shorts(v),
        Nc::Ushort(v) => AttributeValue::Int(v as i32),
        Nc::Ushorts(v) => AttributeValue::Ints(v.into_iter().map(i32::from).collect()),
        Nc::Int(v) => AttributeValue::Int(v),
        Nc::Ints(v) => AttributeValue::Ints(v),
        Nc::Uint(v) => AttributeValue::Long(v as i64),
        Nc::Uints(v) => AttributeValue::Longs(v.into_iter().map(i64::from).collect()),
        Nc::Longlong(v) => AttributeValue::Long(v),
        Nc::Longlongs(v) => AttributeValue::Longs(v),
        Nc::Float(v) => AttributeValue::Float(v),
        Nc::Floats(v) => AttributeValue::Floats(v),
        Nc::Double(v) => AttributeValue::Double(v),
        Nc::Doubles(v) => AttributeValue::Doubles(v),
        #[allow(unreachable_patterns)]
        _ => return None,
    })
}

fn to_nc_attribute(value: &AttributeValue) -> netcdf::AttributeValue {
    use netcdf::AttributeValue as Nc;

    match value.clone() {
        AttributeValue::Str(s) => Nc::Str(s),
        AttributeValue::Strs(s) => Nc::Strs(s),
        AttributeValue::Byte(v) => Nc::Schar(v),
        AttributeValue::Bytes(v) => Nc::Schars(v),
        AttributeValue::UByte(v) => Nc::Uchar(v),
        AttributeValue::UBytes(v) => Nc::Uchars(v),
        AttributeValue::Short(v) => Nc::Short(v),
        AttributeValue::Shorts(v) => Nc::Shorts(v),
        AttributeValue::Int(v) => Nc::Int(v),
        AttributeValue::Ints(v) => Nc::Ints(v),
        AttributeValue::Long(v) => Nc::Longlong(v),
        AttributeValue::Longs(v) => Nc::Longlongs(v),
        AttributeValue::Float(v) => Nc::Float(v),
        AttributeValue::Floats(v) => Nc::Floats(v),
        AttributeValue::Double(v) => Nc::Double(v),
        AttributeValue::Doubles(v) => Nc::Doubles(v),
    }
}
