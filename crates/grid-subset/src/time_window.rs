//! Mapping timestamp windows onto time-axis indices.

use chrono::{DateTime, Utc};
use dataset_access::DatasetSource;
use goods_common::{CfTimeUnits, TimeParseError, TimeRange};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SubsetError};
use crate::types::IndexWindow;

/// Resolve `[start, end]` to indices of a monotonically increasing time axis.
///
/// The window starts at the first step `>= start` and ends after the last
/// step `<= end`.
pub fn resolve(
    time_values: &[f64],
    units: &CfTimeUnits,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    stride: usize,
) -> Result<IndexWindow> {
    let empty = || SubsetError::EmptyTimeRange {
        start: start.to_rfc3339(),
        end: end.to_rfc3339(),
    };

    let times = decode_all(time_values, units)?;
    let first = times.iter().position(|t| *t >= start).ok_or_else(empty)?;
    let last = times.iter().rposition(|t| *t <= end).ok_or_else(empty)?;

    let end_idx = last + 1;
    if end_idx <= first {
        return Err(empty());
    }
    IndexWindow::new(first, end_idx, stride)
}

fn decode_all(values: &[f64], units: &CfTimeUnits) -> Result<Vec<DateTime<Utc>>> {
    values
        .iter()
        .map(|&v| units.decode(v).map_err(SubsetError::from))
        .collect()
}

/// Default time window applied when a request does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePolicy {
    /// Every available step.
    #[default]
    All,
    /// The most recent `steps` steps.
    Latest { steps: usize },
}

/// Time steps requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeSelection {
    /// Steps within a closed timestamp range.
    Range(TimeRange),
    /// The last `n` steps.
    Latest(usize),
    All,
    /// Defer to the model's [`TimePolicy`].
    #[default]
    ModelDefault,
}

/// Summary of a time axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Spacing between the first two steps.
    pub step_seconds: Option<i64>,
    pub len: usize,
}

/// A decoded time coordinate.
#[derive(Debug, Clone)]
pub struct TimeAxis {
    pub variable: String,
    pub dimension: String,
    pub units: CfTimeUnits,
    pub values: Vec<f64>,
    pub times: Vec<DateTime<Utc>>,
}

impl TimeAxis {
    /// Read `time_var` and decode it with its `units` and `calendar` attributes.
    pub fn load(source: &dyn DatasetSource, time_var: &str) -> Result<Self> {
        let info = source
            .variable(time_var)
            .ok_or_else(|| SubsetError::variable_not_found(time_var, source.identifier()))?;
        if info.rank() != 1 {
            return Err(SubsetError::invalid_grid(format!(
                "time variable '{}' has {} dimensions; expected 1",
                time_var,
                info.rank()
            )));
        }

        let units_attr = info.attribute_str("units").ok_or_else(|| {
            TimeParseError::InvalidUnits(format!("{} has no units attribute", time_var))
        })?;
        let units = CfTimeUnits::parse_with_calendar(units_attr, info.attribute_str("calendar"))?;

        let values = source.read_all(time_var)?.to_f64_vec();
        let times = decode_all(&values, &units)?;

        debug!(variable = %time_var, steps = values.len(), units = %units, "Loaded time axis");
        Ok(Self {
            variable: time_var.to_string(),
            dimension: info.dimensions[0].clone(),
            units,
            values,
            times,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index window for a selection, falling back to `policy` for [`TimeSelection::ModelDefault`].
    pub fn select(
        &self,
        selection: &TimeSelection,
        policy: &TimePolicy,
        stride: usize,
    ) -> Result<IndexWindow> {
        if self.is_empty() {
            return Err(SubsetError::EmptyTimeRange {
                start: "-".to_string(),
                end: "-".to_string(),
            });
        }

        match selection {
            TimeSelection::Range(range) => {
                resolve(&self.values, &self.units, range.start, range.end, stride)
            }
            TimeSelection::Latest(n) => self.latest(*n, stride),
            TimeSelection::All => IndexWindow::full(self.len(), stride),
            TimeSelection::ModelDefault => match policy {
                TimePolicy::All => IndexWindow::full(self.len(), stride),
                TimePolicy::Latest { steps } => self.latest(*steps, stride),
            },
        }
    }

    fn latest(&self, n: usize, stride: usize) -> Result<IndexWindow> {
        if n == 0 {
            return Err(SubsetError::invalid_window("latest step count must be >= 1"));
        }
        IndexWindow::new(self.len().saturating_sub(n), self.len(), stride)
    }

    pub fn summary(&self) -> Option<TimeSummary> {
        let start = *self.times.first()?;
        let end = *self.times.last()?;
        let step_seconds = match self.times.as_slice() {
            [a, b, ..] => Some((*b - *a).num_seconds()),
            _ => None,
        };
        Some(TimeSummary {
            start,
            end,
            step_seconds,
            len: self.len(),
        })
    }
}
