//! The subsetting pipeline: region to index windows to output file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dataset_access::DatasetSource;
use goods_common::{BoundingBox, BoundingRegion};
use tracing::{debug, info, instrument, warn};

use crate::cache::WindowCache;
use crate::config::SubsetConfig;
use crate::error::{Result, SubsetError};
use crate::grid::{GridDescriptor, GridIndexer};
use crate::mapping::VariableMapping;
use crate::plan::{build_plan, PlanInputs, SubsetPlan};
use crate::registry::ModelEntry;
use crate::time_window::{TimeAxis, TimePolicy, TimeSelection};
use crate::types::{CacheStats, DepthSelection, HorizontalWindow};
use crate::writer::SubsetWriter;

/// What to cut out of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRequest {
    pub region: BoundingRegion,
    pub time: TimeSelection,
    /// Applied when `time` is [`TimeSelection::ModelDefault`].
    pub time_policy: TimePolicy,
    pub depth: DepthSelection,
    /// Horizontal stride.
    pub stride: usize,
    pub time_stride: usize,
    /// Overrides dateline detection from the box's own longitudes.
    pub cross_dateline: Option<bool>,
}

impl SubsetRequest {
    pub fn new(region: impl Into<BoundingRegion>) -> Self {
        Self {
            region: region.into(),
            time: TimeSelection::default(),
            time_policy: TimePolicy::default(),
            depth: DepthSelection::default(),
            stride: 1,
            time_stride: 1,
            cross_dateline: None,
        }
    }

    /// Request with a model's default time policy and depth.
    pub fn for_model(model: &ModelEntry, region: impl Into<BoundingRegion>) -> Self {
        Self::new(region)
            .with_time_policy(model.time_policy)
            .with_depth(model.depth)
    }

    pub fn with_time(mut self, time: TimeSelection) -> Self {
        self.time = time;
        self
    }

    pub fn with_time_policy(mut self, policy: TimePolicy) -> Self {
        self.time_policy = policy;
        self
    }

    pub fn with_depth(mut self, depth: DepthSelection) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_time_stride(mut self, stride: usize) -> Self {
        self.time_stride = stride;
        self
    }

    pub fn with_cross_dateline(mut self, cross: bool) -> Self {
        self.cross_dateline = Some(cross);
        self
    }
}

/// Runs subset requests against model datasets.
pub struct Subsetter {
    config: SubsetConfig,
    indexer: GridIndexer,
    writer: SubsetWriter,
    cache: Mutex<WindowCache>,
}

impl Subsetter {
    pub fn new(config: SubsetConfig) -> Result<Self> {
        config.validate().map_err(SubsetError::Config)?;
        Ok(Self {
            indexer: GridIndexer::new(&config),
            writer: SubsetWriter::new(),
            cache: Mutex::new(WindowCache::new(config.window_cache_entries)),
            config,
        })
    }

    pub fn config(&self) -> &SubsetConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).stats()
    }

    /// Center-family window for a box, served from the window cache when possible.
    pub fn center_window(
        &self,
        descriptor: &GridDescriptor,
        bbox: &BoundingBox,
        crosses_dateline: bool,
        stride: usize,
    ) -> Result<HorizontalWindow> {
        let key = WindowCache::key(&descriptor.source_id, bbox, crosses_dateline, stride);
        if let Some(window) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            debug!(window = %window, "Window cache hit");
            return Ok(window);
        }

        let window = descriptor
            .family
            .compute_window(&self.indexer, bbox, crosses_dateline, stride)?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, window);
        Ok(window)
    }

    /// Compute everything needed for a subset without writing it.
    ///
    /// `grid_source` holds the grid coordinates when they are not in `source`.
    pub fn plan(
        &self,
        source: &dyn DatasetSource,
        grid_source: Option<&dyn DatasetSource>,
        descriptor: &GridDescriptor,
        mapping: &VariableMapping,
        request: &SubsetRequest,
    ) -> Result<SubsetPlan> {
        let grid_source = grid_source.unwrap_or(source);

        let requested = request.region.to_box()?;
        let bbox = requested.rotate_if_needed(&descriptor.longitude);
        // A rotated box is already continuous in the grid's domain, so an
        // explicit dateline flag no longer applies to it.
        let crosses_dateline = if bbox != requested {
            warn!(
                requested = %requested.cache_key(),
                rotated = %bbox.cache_key(),
                "Rotated request longitudes into the grid's 0-360 domain"
            );
            bbox.crosses_dateline()
        } else {
            request
                .cross_dateline
                .unwrap_or_else(|| bbox.crosses_dateline())
        };

        for name in mapping.data_variables() {
            if !source.has_variable(name) {
                return Err(SubsetError::variable_not_found(name, source.identifier()));
            }
        }

        let center = self.center_window(descriptor, &bbox, crosses_dateline, request.stride)?;
        let windows = descriptor.family.family_windows(&center)?;
        debug!(center = %center, families = windows.len(), "Derived family windows");

        let time_axis = TimeAxis::load(source, &mapping.time)?;
        let time_window =
            time_axis.select(&request.time, &request.time_policy, request.time_stride)?;

        let plan = build_plan(&PlanInputs {
            source,
            grid_source,
            descriptor,
            mapping,
            windows: &windows,
            time_axis: &time_axis,
            time_window,
            depth: request.depth,
        })?;
        plan.check_size(&self.config)?;

        info!(
            window = %center,
            time = %time_window,
            variables = plan.variables.len(),
            estimated_mb = plan.estimated_mb(),
            "Planned subset"
        );
        Ok(plan)
    }

    /// Subset `source` and write the result to `destination`.
    #[instrument(
        skip(self, source, grid_source, descriptor, mapping, request),
        fields(source = %source.identifier(), destination = %destination.display())
    )]
    pub fn subset(
        &self,
        source: &dyn DatasetSource,
        grid_source: Option<&dyn DatasetSource>,
        descriptor: &GridDescriptor,
        mapping: &VariableMapping,
        request: &SubsetRequest,
        destination: &Path,
    ) -> Result<PathBuf> {
        let plan = self.plan(source, grid_source, descriptor, mapping, request)?;
        self.writer
            .write(&plan, source, grid_source.unwrap_or(source), destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = SubsetRequest::new(BoundingBox::new(-83.0, 27.0, -82.0, 28.0));
        assert_eq!(request.stride, 1);
        assert_eq!(request.time, TimeSelection::ModelDefault);
        assert_eq!(request.time_policy, TimePolicy::All);
        assert_eq!(request.depth, DepthSelection::Level(0));
        assert_eq!(request.cross_dateline, None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SubsetConfig {
            min_window_cells: 0,
            ..Default::default()
        };
        assert!(matches!(Subsetter::new(config), Err(SubsetError::Config(_))));
    }
}
