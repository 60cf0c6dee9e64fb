//! Subset planning: which variables to copy and how to slice them.
//!
//! Slicing is driven by dimension names. A time dimension gets the time
//! window, vertical dimensions are kept whole or reduced to one level, and
//! horizontal dimensions get their point family's window. Anything else is
//! copied in full.

use std::collections::{BTreeSet, HashMap};

use dataset_access::{AttributeValue, AxisSlice, DataType, DatasetSource, VariableInfo};
use serde::Serialize;
use tracing::debug;

use crate::config::SubsetConfig;
use crate::error::{Result, SubsetError};
use crate::grid::GridDescriptor;
use crate::mapping::VariableMapping;
use crate::time_window::TimeAxis;
use crate::types::{DepthSelection, FamilyWindows, IndexWindow};

/// A dimension of the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDimension {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

/// One variable to copy, with its source hyperslab and output layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputVariable {
    pub name: String,
    /// Read from the grid source rather than the data source.
    pub from_grid: bool,
    #[serde(skip)]
    pub slices: Vec<AxisSlice>,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub data_type: DataType,
    #[serde(skip)]
    pub attributes: Vec<(String, AttributeValue)>,
}

impl OutputVariable {
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Everything needed to write a subset, computed before any output exists.
#[derive(Debug, Clone, Serialize)]
pub struct SubsetPlan {
    pub source_id: String,
    pub windows: FamilyWindows,
    pub time_window: IndexWindow,
    pub depth: DepthSelection,
    pub dimensions: Vec<OutputDimension>,
    pub variables: Vec<OutputVariable>,
}

impl SubsetPlan {
    /// Uncompressed size of all output variables.
    pub fn estimated_bytes(&self) -> u64 {
        self.variables
            .iter()
            .map(|v| (v.element_count() * v.data_type.size_bytes()) as u64)
            .sum()
    }

    pub fn estimated_mb(&self) -> f64 {
        self.estimated_bytes() as f64 / (1024.0 * 1024.0)
    }

    pub fn variable(&self, name: &str) -> Option<&OutputVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&OutputDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Fail with `SubsetTooLarge` when the estimate exceeds the configured limit.
    pub fn check_size(&self, config: &SubsetConfig) -> Result<()> {
        match (config.max_file_size_mb, config.max_file_size_bytes()) {
            (Some(limit_mb), Some(limit)) if self.estimated_bytes() > limit => {
                Err(SubsetError::SubsetTooLarge {
                    estimated_mb: self.estimated_mb(),
                    limit_mb,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Inputs for [`build_plan`].
pub struct PlanInputs<'a> {
    pub source: &'a dyn DatasetSource,
    pub grid_source: &'a dyn DatasetSource,
    pub descriptor: &'a GridDescriptor,
    pub mapping: &'a VariableMapping,
    pub windows: &'a FamilyWindows,
    pub time_axis: &'a TimeAxis,
    pub time_window: IndexWindow,
    pub depth: DepthSelection,
}

/// Per-dimension slicing rules shared by every planned variable.
struct Slicer<'a> {
    inputs: &'a PlanInputs<'a>,
    vertical: Vec<&'a str>,
}

impl Slicer<'_> {
    /// Slice for `dim`, and whether the dimension survives in the output.
    fn slice(&self, dim: &str, len: usize) -> Result<(AxisSlice, bool)> {
        let inputs = self.inputs;
        if dim == inputs.time_axis.dimension {
            return Ok((inputs.time_window.within(len)?.to_slice(), true));
        }
        if self.vertical.contains(&dim) {
            return Ok(match inputs.depth.resolve(len)? {
                None => (AxisSlice::full(len), true),
                Some(level) => (AxisSlice::index(level), false),
            });
        }
        match inputs.descriptor.family.horizontal_slice(dim, inputs.windows) {
            Some(window) => Ok((window.within(len)?.to_slice(), true)),
            None => Ok((AxisSlice::full(len), true)),
        }
    }
}

/// Build the variable list and output dimensions for a subset.
pub fn build_plan(inputs: &PlanInputs<'_>) -> Result<SubsetPlan> {
    let slicer = Slicer {
        inputs,
        vertical: inputs.mapping.vertical_coordinates(),
    };
    let dropped: Vec<&str> = if inputs.depth.keeps_vertical() {
        Vec::new()
    } else {
        slicer.vertical.clone()
    };

    let mut planner = Planner::default();
    let family = &inputs.descriptor.family;

    for grid_var in family.grid_variables(inputs.depth.keeps_vertical(), inputs.mapping.depth.as_deref()) {
        let located = if let Some(info) = inputs.grid_source.variable(&grid_var.name) {
            Some((info, true))
        } else {
            inputs.source.variable(&grid_var.name).map(|info| (info, false))
        };
        match located {
            Some((info, from_grid)) => {
                let attrs = family.output_attributes(&info, &dropped);
                planner.add(&slicer, info, from_grid, attrs)?;
            }
            None if grid_var.required => {
                return Err(SubsetError::variable_not_found(
                    &grid_var.name,
                    inputs.grid_source.identifier(),
                ));
            }
            None => debug!(variable = %grid_var.name, "Optional grid variable absent; skipping"),
        }
    }

    let time_info = inputs
        .source
        .variable(&inputs.time_axis.variable)
        .ok_or_else(|| {
            SubsetError::variable_not_found(&inputs.time_axis.variable, inputs.source.identifier())
        })?;
    let attrs = family.output_attributes(&time_info, &dropped);
    planner.add(&slicer, time_info, false, attrs)?;

    for name in inputs.mapping.data_variables() {
        let info = inputs
            .source
            .variable(name)
            .ok_or_else(|| SubsetError::variable_not_found(name, inputs.source.identifier()))?;
        let point_family = family.resolve_family(&info)?;
        debug!(variable = %name, family = %point_family, "Resolved grid point family");
        let attrs = family.output_attributes(&info, &dropped);
        planner.add(&slicer, info, false, attrs)?;
    }

    let time_dim = &inputs.time_axis.dimension;
    let dimensions = planner
        .dimensions
        .into_iter()
        .map(|(name, len)| OutputDimension {
            unlimited: &name == time_dim,
            name,
            len,
        })
        .collect();

    Ok(SubsetPlan {
        source_id: inputs.source.identifier().to_string(),
        windows: inputs.windows.clone(),
        time_window: inputs.time_window,
        depth: inputs.depth,
        dimensions,
        variables: planner.variables,
    })
}

#[derive(Default)]
struct Planner {
    dimensions: Vec<(String, usize)>,
    dim_lens: HashMap<String, usize>,
    seen: BTreeSet<String>,
    variables: Vec<OutputVariable>,
}

impl Planner {
    fn add(
        &mut self,
        slicer: &Slicer<'_>,
        info: VariableInfo,
        from_grid: bool,
        attributes: Vec<(String, AttributeValue)>,
    ) -> Result<()> {
        if !self.seen.insert(info.name.clone()) {
            return Ok(());
        }

        let mut slices = Vec::with_capacity(info.rank());
        let mut dimensions = Vec::new();
        let mut shape = Vec::new();
        for (dim, &len) in info.dimensions.iter().zip(&info.shape) {
            let (slice, kept) = slicer.slice(dim, len)?;
            if kept {
                self.record_dimension(dim, slice.len())?;
                dimensions.push(dim.clone());
                shape.push(slice.len());
            }
            slices.push(slice);
        }

        self.variables.push(OutputVariable {
            name: info.name,
            from_grid,
            slices,
            dimensions,
            shape,
            data_type: info.data_type,
            attributes,
        });
        Ok(())
    }

    fn record_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        match self.dim_lens.get(name) {
            Some(&existing) if existing != len => Err(SubsetError::invalid_window(format!(
                "dimension '{}' sliced to both {} and {}",
                name, existing, len
            ))),
            Some(_) => Ok(()),
            None => {
                self.dim_lens.insert(name.to_string(), len);
                self.dimensions.push((name.to_string(), len));
                Ok(())
            }
        }
    }
}
