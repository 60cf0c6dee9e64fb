//! netCDF-4 output for subset plans.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::Utc;
use dataset_access::{AttributeValue, DatasetSource, NetcdfSink};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::plan::SubsetPlan;

/// Temporary path a subset is written to before it is renamed into place.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Writes subset plans to netCDF-4 files.
#[derive(Debug, Clone)]
pub struct SubsetWriter {
    /// Name recorded in the appended `history` line.
    program: String,
}

impl Default for SubsetWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SubsetWriter {
    pub fn new() -> Self {
        Self {
            program: format!("goods-subset {}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Write `plan` to `destination`.
    ///
    /// Output goes to `<destination>.partial` first and is renamed on
    /// success. On failure the partial file is removed and `destination` is
    /// left untouched.
    pub fn write(
        &self,
        plan: &SubsetPlan,
        source: &dyn DatasetSource,
        grid_source: &dyn DatasetSource,
        destination: &Path,
    ) -> Result<PathBuf> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let partial = partial_path(destination);
        let written = self
            .write_partial(plan, source, grid_source, &partial)
            .and_then(|()| Ok(std::fs::rename(&partial, destination)?));
        match written {
            Ok(()) => {
                info!(
                    path = %destination.display(),
                    variables = plan.variables.len(),
                    bytes = plan.estimated_bytes(),
                    "Wrote subset"
                );
                Ok(destination.to_path_buf())
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&partial) {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %partial.display(), error = %rm, "Failed to remove partial output");
                    }
                }
                Err(e)
            }
        }
    }

    fn write_partial(
        &self,
        plan: &SubsetPlan,
        source: &dyn DatasetSource,
        grid_source: &dyn DatasetSource,
        path: &Path,
    ) -> Result<()> {
        let mut sink = NetcdfSink::create(path)?;

        for dim in &plan.dimensions {
            if dim.unlimited {
                sink.add_unlimited_dimension(&dim.name)?;
            } else {
                sink.add_dimension(&dim.name, dim.len)?;
            }
        }

        let mut history = None;
        for (name, value) in source.global_attributes() {
            if name == "history" {
                history = value.as_str().map(str::to_string);
                continue;
            }
            sink.add_global_attribute(&name, &value)?;
        }
        let line = self.history_line(plan);
        let history = match history {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line,
        };
        sink.add_global_attribute("history", &AttributeValue::Str(history))?;

        for var in &plan.variables {
            let dims: Vec<&str> = var.dimensions.iter().map(String::as_str).collect();
            sink.define_variable(&var.name, var.data_type, &dims, &var.attributes)?;
        }

        for var in &plan.variables {
            let from: &dyn DatasetSource = if var.from_grid { grid_source } else { source };
            let data = from.read(&var.name, &var.slices)?;
            debug!(variable = %var.name, shape = ?var.shape, "Copying variable");
            sink.put(&var.name, &data, &var.shape)?;
        }

        sink.close()?;
        Ok(())
    }

    fn history_line(&self, plan: &SubsetPlan) -> String {
        let windows = plan
            .windows
            .center()
            .map(|w| w.to_string())
            .unwrap_or_default();
        format!(
            "{}: {} subset of {} ({}, time {})",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            self.program,
            plan.source_id,
            windows,
            plan.time_window
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/out/tbofs.nc")),
            PathBuf::from("/tmp/out/tbofs.nc.partial")
        );
        assert_eq!(partial_path(Path::new("a.nc")), PathBuf::from("a.nc.partial"));
    }
}
