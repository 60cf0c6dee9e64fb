//! Subcommand implementations.
//!
//! Dataset access is blocking, so everything touching a source runs on the
//! blocking pool.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dataset_access::{DatasetSource, NetcdfSource};
use goods_common::BoundingBox;
use grid_subset::{
    partial_path, GridDescriptor, ModelEntry, ModelRegistry, SubsetConfig, SubsetPlan,
    SubsetRequest, Subsetter, TimeAxis,
};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Result of a `fetch` run.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Dry run: the plan that would have been written.
    Planned(Box<SubsetPlan>),
    Written(PathBuf),
}

/// Models matching the optional filters, in id order.
pub fn list<'a>(
    registry: &'a ModelRegistry,
    parameter: Option<&'a str>,
    bbox: Option<&'a BoundingBox>,
) -> Vec<&'a ModelEntry> {
    let mut models: Vec<&ModelEntry> = match parameter {
        Some(p) => registry.with_parameter(p).collect(),
        None => registry.iter().collect(),
    };
    if let Some(bbox) = bbox {
        let inside: Vec<&str> = registry.intersecting(bbox).map(|m| m.id.as_str()).collect();
        models.retain(|m| inside.contains(&m.id.as_str()));
    }
    models
}

/// One line per model for `list`.
pub fn format_model_line(model: &ModelEntry) -> String {
    format!(
        "{:<8} {:<12} {:<40} {}",
        model.id,
        model.grid_kind.to_string(),
        model.name,
        model.parameters.join(",")
    )
}

fn open(location: &str) -> Result<NetcdfSource> {
    NetcdfSource::open(location).with_context(|| format!("failed to open {}", location))
}

/// Grid envelope and longitude convention of a model.
pub fn bounds(model: &ModelEntry) -> Result<Value> {
    let grid = open(model.grid_location())?;
    let descriptor = GridDescriptor::load(&grid, model.grid_kind, &model.variables)?;
    let (rows, cols) = descriptor.family.shape();

    Ok(json!({
        "model": model.id,
        "grid_kind": descriptor.kind(),
        "shape": [rows, cols],
        "envelope": descriptor.envelope()?,
        "longitude": descriptor.longitude,
    }))
}

/// Time-axis summary of a model.
pub fn times(model: &ModelEntry) -> Result<Value> {
    let source = open(&model.url)?;
    let axis = TimeAxis::load(&source, &model.variables.time)?;
    let summary = axis
        .summary()
        .with_context(|| format!("model {} has an empty time axis", model.id))?;

    Ok(json!({
        "model": model.id,
        "time_variable": axis.variable,
        "summary": summary,
        "default_policy": model.time_policy,
    }))
}

/// Plan, or plan and write, one subset.
pub fn run_subset(
    model: &ModelEntry,
    request: &SubsetRequest,
    config: SubsetConfig,
    destination: Option<&Path>,
) -> Result<FetchOutcome> {
    let source = open(&model.url)?;
    let grid = model.grid_url.as_deref().map(open).transpose()?;
    let grid_source: Option<&dyn DatasetSource> = grid.as_ref().map(|g| g as &dyn DatasetSource);

    let descriptor = GridDescriptor::load(
        grid_source.unwrap_or(&source),
        model.grid_kind,
        &model.variables,
    )?;
    let subsetter = Subsetter::new(config)?;

    match destination {
        None => {
            let plan = subsetter.plan(&source, grid_source, &descriptor, &model.variables, request)?;
            Ok(FetchOutcome::Planned(Box::new(plan)))
        }
        Some(dest) => {
            let path = subsetter.subset(
                &source,
                grid_source,
                &descriptor,
                &model.variables,
                request,
                dest,
            )?;
            Ok(FetchOutcome::Written(path))
        }
    }
}

/// Run `job` on the blocking pool, giving up after `limit`.
///
/// On timeout any partial or complete output at `destination` is removed.
pub async fn with_timeout<T, F>(limit: Duration, destination: Option<&Path>, job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(job);
    match tokio::time::timeout(limit, handle).await {
        Ok(joined) => joined.context("subset task failed")?,
        Err(_) => {
            if let Some(dest) = destination {
                remove_output(dest);
            }
            bail!("subset timed out after {}s", limit.as_secs_f64())
        }
    }
}

fn remove_output(destination: &Path) {
    for path in [partial_path(destination), destination.to_path_buf()] {
        match fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "Removed incomplete output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove output"),
        }
    }
}
