//! Core types for index windows and point families.

use std::collections::BTreeMap;
use std::fmt;

use dataset_access::AxisSlice;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SubsetError};

/// Half-open index range `[start, end)` with a stride, along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexWindow {
    pub start: usize,
    pub end: usize,
    pub stride: usize,
}

impl IndexWindow {
    /// Create a window, enforcing `start < end` and `stride >= 1`.
    pub fn new(start: usize, end: usize, stride: usize) -> Result<Self> {
        if stride == 0 {
            return Err(SubsetError::invalid_window("stride must be >= 1"));
        }
        if start >= end {
            return Err(SubsetError::invalid_window(format!(
                "start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end, stride })
    }

    /// The whole axis of length `extent`.
    pub fn full(extent: usize, stride: usize) -> Result<Self> {
        Self::new(0, extent, stride)
    }

    /// Check `end <= extent`.
    pub fn within(self, extent: usize) -> Result<Self> {
        if self.end > extent {
            return Err(SubsetError::invalid_window(format!(
                "end {} exceeds extent {}",
                self.end, extent
            )));
        }
        Ok(self)
    }

    /// Shrink the end by `n`, failing if the window would become empty.
    pub fn shrink_end(&self, n: usize) -> Result<Self> {
        let end = self.end.checked_sub(n).ok_or_else(|| {
            SubsetError::invalid_window(format!("cannot shrink end {} by {}", self.end, n))
        })?;
        Self::new(self.start, end, self.stride)
    }

    /// Number of selected indices.
    pub fn len(&self) -> usize {
        self.to_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of indices in `[start, end)` ignoring stride.
    pub fn span(&self) -> usize {
        self.end - self.start
    }

    pub fn is_full(&self, extent: usize) -> bool {
        self.start == 0 && self.end == extent
    }

    pub fn to_slice(&self) -> AxisSlice {
        AxisSlice::new(self.start, self.end, self.stride)
    }

    /// Selected source indices.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start..self.end).step_by(self.stride)
    }
}

impl fmt::Display for IndexWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}:{}]", self.start, self.end, self.stride)
    }
}

/// Row and column windows over a 2-D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HorizontalWindow {
    pub rows: IndexWindow,
    pub cols: IndexWindow,
}

impl HorizontalWindow {
    pub fn new(rows: IndexWindow, cols: IndexWindow) -> Self {
        Self { rows, cols }
    }

    pub fn full(rows: usize, cols: usize, stride: usize) -> Result<Self> {
        Ok(Self::new(
            IndexWindow::full(rows, stride)?,
            IndexWindow::full(cols, stride)?,
        ))
    }

    /// Output shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }
}

impl fmt::Display for HorizontalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows {} cols {}", self.rows, self.cols)
    }
}

/// Point families of an Arakawa-C staggered grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointFamily {
    /// Cell centers.
    Rho,
    /// East-west face midpoints.
    U,
    /// North-south face midpoints.
    V,
    /// Cell corners.
    Psi,
}

impl PointFamily {
    pub const ALL: [PointFamily; 4] = [
        PointFamily::Rho,
        PointFamily::U,
        PointFamily::V,
        PointFamily::Psi,
    ];

    /// Name suffix used by ROMS-style variables and dimensions (`lon_u`, `eta_u`).
    pub fn suffix(&self) -> &'static str {
        match self {
            PointFamily::Rho => "rho",
            PointFamily::U => "u",
            PointFamily::V => "v",
            PointFamily::Psi => "psi",
        }
    }

    /// `(rows, cols)` this family has fewer than the center family.
    pub fn offset(&self) -> (usize, usize) {
        match self {
            PointFamily::Rho => (0, 0),
            PointFamily::U => (0, 1),
            PointFamily::V => (1, 0),
            PointFamily::Psi => (1, 1),
        }
    }

    pub fn lon_name(&self) -> String {
        format!("lon_{}", self.suffix())
    }

    pub fn lat_name(&self) -> String {
        format!("lat_{}", self.suffix())
    }

    pub fn mask_name(&self) -> String {
        format!("mask_{}", self.suffix())
    }

    /// Find the family whose suffix ends `name` (`eta_psi`, `lon_v`, ...).
    pub fn from_name_suffix(name: &str) -> Option<Self> {
        PointFamily::ALL
            .into_iter()
            .find(|f| name.ends_with(&format!("_{}", f.suffix())))
    }
}

impl fmt::Display for PointFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Horizontal windows for every point family present on a grid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FamilyWindows {
    windows: BTreeMap<PointFamily, HorizontalWindow>,
}

impl FamilyWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: PointFamily, window: HorizontalWindow) {
        self.windows.insert(family, window);
    }

    pub fn get(&self, family: PointFamily) -> Option<&HorizontalWindow> {
        self.windows.get(&family)
    }

    pub fn center(&self) -> Option<&HorizontalWindow> {
        self.get(PointFamily::Rho)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PointFamily, &HorizontalWindow)> {
        self.windows.iter()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Vertical level selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthSelection {
    /// Keep the full vertical axis.
    All,
    /// One level; negative values count from the end (`-1` is the last level).
    Level(isize),
}

impl Default for DepthSelection {
    fn default() -> Self {
        Self::Level(0)
    }
}

impl DepthSelection {
    /// Resolve to a concrete level index for an axis of length `levels`.
    pub fn resolve(&self, levels: usize) -> Result<Option<usize>> {
        match *self {
            DepthSelection::All => Ok(None),
            DepthSelection::Level(i) => {
                let idx = if i < 0 {
                    levels.checked_sub(i.unsigned_abs())
                } else {
                    Some(i as usize).filter(|&idx| idx < levels)
                };
                idx.map(Some).ok_or_else(|| {
                    SubsetError::invalid_window(format!(
                        "depth level {} out of range for {} levels",
                        i, levels
                    ))
                })
            }
        }
    }

    pub fn keeps_vertical(&self) -> bool {
        matches!(self, DepthSelection::All)
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
