//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand};
use goods_common::{parse_iso8601, BoundingBox, TimeRange};
use grid_subset::{DepthSelection, ModelEntry, SubsetRequest, TimeSelection, VariableMapping};

/// Ocean model subsetting tool
#[derive(Parser, Debug)]
#[command(name = "goods-fetch")]
#[command(about = "Subset ocean model output by bounding box and time window")]
pub struct Cli {
    /// Directory of model registry YAML files
    #[arg(long, global = true, default_value = "config/models", env = "GOODS_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Log level or filter directive
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "GOODS_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered models
    List {
        /// Only models offering this parameter
        #[arg(long)]
        parameter: Option<String>,

        /// Only models whose domain intersects west,south,east,north
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,
    },

    /// Print a model's grid envelope and longitude convention
    Bounds {
        /// Model identifier
        model: String,
    },

    /// Print a model's available time range
    Times {
        /// Model identifier
        model: String,
    },

    /// Subset a model and write a netCDF file
    Fetch(FetchArgs),
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("region").required(true).args(["bbox", "example_bbox"])))]
pub struct FetchArgs {
    /// Model identifier
    pub model: String,

    /// Region as west,south,east,north
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    /// Use the model's example region
    #[arg(long)]
    pub example_bbox: bool,

    /// First timestamp (ISO 8601)
    #[arg(long, value_parser = parse_time, requires = "end", conflicts_with_all = ["latest", "all_times"])]
    pub start: Option<DateTime<Utc>>,

    /// Last timestamp (ISO 8601)
    #[arg(long, value_parser = parse_time, requires = "start")]
    pub end: Option<DateTime<Utc>>,

    /// Only the most recent N steps
    #[arg(long, conflicts_with = "all_times")]
    pub latest: Option<usize>,

    /// Every available step, ignoring the model's default policy
    #[arg(long)]
    pub all_times: bool,

    /// Keep every vertical level
    #[arg(long, conflicts_with = "depth_level")]
    pub all_depths: bool,

    /// Single vertical level; negative counts from the last level
    #[arg(long, allow_hyphen_values = true)]
    pub depth_level: Option<isize>,

    /// Only this data role, e.g. eastward_velocity (repeatable)
    #[arg(long = "variable", value_name = "ROLE")]
    pub variables: Vec<String>,

    /// Horizontal stride
    #[arg(long, default_value_t = 1)]
    pub stride: usize,

    /// Time stride
    #[arg(long, default_value_t = 1)]
    pub time_stride: usize,

    /// Treat the region as crossing the antimeridian
    #[arg(long)]
    pub cross_dateline: bool,

    /// Output file (default: <model>_<timestamp>.nc)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Abort the subset after this many seconds
    #[arg(long, default_value_t = 600, env = "GOODS_FETCH_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Print the subset plan without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl FetchArgs {
    /// Build a request, falling back to the model's defaults for time and depth.
    pub fn to_request(&self, model: &ModelEntry) -> Result<SubsetRequest> {
        let region = match self.bbox {
            Some(bbox) => bbox,
            None => model
                .example_bbox
                .with_context(|| format!("model {} has no example_bbox", model.id))?,
        };

        let mut request = SubsetRequest::for_model(model, region)
            .with_stride(self.stride)
            .with_time_stride(self.time_stride);

        let time = match (self.start, self.end, self.latest) {
            (Some(start), Some(end), _) => TimeSelection::Range(TimeRange::new(start, end)),
            (_, _, Some(n)) => TimeSelection::Latest(n),
            _ if self.all_times => TimeSelection::All,
            _ => TimeSelection::ModelDefault,
        };
        request = request.with_time(time);

        if self.all_depths {
            request = request.with_depth(DepthSelection::All);
        } else if let Some(level) = self.depth_level {
            request = request.with_depth(DepthSelection::Level(level));
        }

        if self.cross_dateline {
            request = request.with_cross_dateline(true);
        }
        Ok(request)
    }

    /// The model's variable mapping, narrowed to the `--variable` roles when given.
    pub fn mapping(&self, model: &ModelEntry) -> Result<VariableMapping> {
        if self.variables.is_empty() {
            return Ok(model.variables.clone());
        }
        for role in &self.variables {
            model
                .variables
                .role(role)
                .with_context(|| format!("model {} has no variable for role '{}'", model.id, role))?;
        }

        let mapping = model.variables.with_roles(&self.variables);
        if mapping.data.is_empty() {
            bail!(
                "no data variables selected; model {} offers: {}",
                model.id,
                model.variables.data.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        Ok(mapping)
    }

    /// Destination path, defaulting to a timestamped name in the working directory.
    pub fn output_path(&self, model: &ModelEntry, now: DateTime<Utc>) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}_{}.nc",
                model.id.to_lowercase(),
                now.format("%Y%m%dT%H%M%SZ")
            ))
        })
    }
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    BoundingBox::from_lonlat_string(s).map_err(|e| e.to_string())
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    parse_iso8601(s).map_err(|e| e.to_string())
}
