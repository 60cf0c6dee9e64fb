//! In-memory dataset, used for synthetic grids and tests.

use std::collections::BTreeMap;

use crate::error::{DatasetError, DatasetResult};
use crate::slice::{hyperslab_offsets, AxisSlice};
use crate::types::{ArrayData, AttributeValue, VariableInfo};
use crate::DatasetSource;

#[derive(Debug, Clone)]
struct MemoryVariable {
    info: VariableInfo,
    data: ArrayData,
}

/// A dataset held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    identifier: String,
    dimensions: BTreeMap<String, usize>,
    variables: BTreeMap<String, MemoryVariable>,
    global_attributes: Vec<(String, AttributeValue)>,
}

impl MemoryDataset {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    /// Declare a dimension. Redeclaring with a different length is an error.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> DatasetResult<&mut Self> {
        match self.dimensions.get(name) {
            Some(&existing) if existing != len => Err(DatasetError::invalid_slice(
                name,
                format!("dimension already declared with length {}", existing),
            )),
            _ => {
                self.dimensions.insert(name.to_string(), len);
                Ok(self)
            }
        }
    }

    /// Add a variable over previously declared dimensions.
    pub fn add_variable(
        &mut self,
        name: &str,
        dimensions: &[&str],
        data: ArrayData,
    ) -> DatasetResult<&mut Self> {
        let mut shape = Vec::with_capacity(dimensions.len());
        for dim in dimensions {
            let len = self.dimensions.get(*dim).copied().ok_or_else(|| {
                DatasetError::invalid_slice(name, format!("undeclared dimension '{}'", dim))
            })?;
            shape.push(len);
        }

        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(DatasetError::invalid_slice(
                name,
                format!("data has {} elements, shape {:?} needs {}", data.len(), shape, expected),
            ));
        }

        let info = VariableInfo {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape,
            data_type: data.data_type(),
            attributes: Vec::new(),
        };
        self.variables
            .insert(name.to_string(), MemoryVariable { info, data });
        Ok(self)
    }

    /// Set (or replace) an attribute on a variable.
    pub fn set_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> DatasetResult<&mut Self> {
        let var = self
            .variables
            .get_mut(variable)
            .ok_or_else(|| DatasetError::variable_not_found(&self.identifier, variable))?;
        upsert(&mut var.info.attributes, name, value.into());
        Ok(self)
    }

    pub fn set_global_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) -> &mut Self {
        upsert(&mut self.global_attributes, name, value.into());
        self
    }
}

fn upsert(attrs: &mut Vec<(String, AttributeValue)>, name: &str, value: AttributeValue) {
    match attrs.iter_mut().find(|(n, _)| n == name) {
        Some(slot) => slot.1 = value,
        None => attrs.push((name.to_string(), value)),
    }
}

impl DatasetSource for MemoryDataset {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.variables.get(name).map(|v| v.info.clone())
    }

    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).copied()
    }

    fn global_attributes(&self) -> Vec<(String, AttributeValue)> {
        self.global_attributes.clone()
    }

    fn read(&self, name: &str, slices: &[AxisSlice]) -> DatasetResult<ArrayData> {
        let var = self
            .variables
            .get(name)
            .ok_or_else(|| DatasetError::variable_not_found(&self.identifier, name))?;
        let offsets = hyperslab_offsets(&var.info.shape, slices)
            .map_err(|msg| DatasetError::invalid_slice(name, msg))?;
        Ok(var.data.gather(&offsets))
    }
}
