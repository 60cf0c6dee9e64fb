//! Bounding box to index-window search over lat/lon grids.
//!
//! The selection rule is the same for both grid shapes:
//!
//! 1. A box matching the grid envelope (within tolerance) yields the full grid.
//! 2. Otherwise every cell with `south <= lat <= north` and a matching
//!    longitude is selected. Without dateline crossing the longitude test is
//!    `west <= lon <= east`; across the dateline it is `lon >= west || lon <= east`.
//! 3. The window spans the row/column extrema of selected cells, with an
//!    exclusive end.
//! 4. Selections narrower than `min_window_cells` in either axis fall back to
//!    the full grid. A box outside the grid envelope is an error.

use goods_common::BoundingBox;
use tracing::{debug, warn};

use crate::config::SubsetConfig;
use crate::error::{Result, SubsetError};
use crate::grid::{envelope, CoordinateGrid};
use crate::types::{HorizontalWindow, IndexWindow};

/// Computes row/column windows covering a bounding box.
#[derive(Debug, Clone, Copy)]
pub struct GridIndexer {
    full_extent_tolerance: f64,
    min_window_cells: usize,
}

impl Default for GridIndexer {
    fn default() -> Self {
        Self::new(&SubsetConfig::default())
    }
}

/// Row and column extrema of the selected cells.
type Extrema = ((usize, usize), (usize, usize));

impl GridIndexer {
    pub fn new(config: &SubsetConfig) -> Self {
        Self {
            full_extent_tolerance: config.full_extent_tolerance,
            min_window_cells: config.min_window_cells,
        }
    }

    /// Window over a 2-D (possibly curvilinear) grid.
    pub fn compute_window(
        &self,
        lat: &CoordinateGrid,
        lon: &CoordinateGrid,
        bbox: &BoundingBox,
        crosses_dateline: bool,
        stride: usize,
    ) -> Result<HorizontalWindow> {
        if lat.shape() != lon.shape() {
            return Err(SubsetError::invalid_grid(format!(
                "latitude shape {:?} differs from longitude shape {:?}",
                lat.shape(),
                lon.shape()
            )));
        }
        let (rows, cols) = lat.shape();
        let grid_env = envelope(lat.values(), lon.values())?;

        if bbox.approx_eq(&grid_env, self.full_extent_tolerance) {
            debug!(bbox = %bbox.cache_key(), "Box matches full grid extent");
            return HorizontalWindow::full(rows, cols, stride);
        }

        let mut extrema: Option<Extrema> = None;
        for r in 0..rows {
            for c in 0..cols {
                if cell_selected(lat.get(r, c), lon.get(r, c), bbox, crosses_dateline) {
                    extrema = Some(match extrema {
                        None => ((r, r), (c, c)),
                        Some(((r0, r1), (c0, c1))) => {
                            ((r0.min(r), r1.max(r)), (c0.min(c), c1.max(c)))
                        }
                    });
                }
            }
        }

        self.finish(extrema, rows, cols, &grid_env, bbox, crosses_dateline, stride)
    }

    /// Window over a separable grid given its 1-D latitude (rows) and longitude (columns) axes.
    pub fn compute_window_rectilinear(
        &self,
        lat: &[f64],
        lon: &[f64],
        bbox: &BoundingBox,
        crosses_dateline: bool,
        stride: usize,
    ) -> Result<HorizontalWindow> {
        let grid_env = envelope(lat, lon)?;

        if bbox.approx_eq(&grid_env, self.full_extent_tolerance) {
            debug!(bbox = %bbox.cache_key(), "Box matches full grid extent");
            return HorizontalWindow::full(lat.len(), lon.len(), stride);
        }

        let row_range = index_extrema(lat.iter().map(|&v| lat_selected(v, bbox)));
        let col_range =
            index_extrema(lon.iter().map(|&v| lon_selected(v, bbox, crosses_dateline)));
        let extrema = row_range.zip(col_range);

        self.finish(
            extrema,
            lat.len(),
            lon.len(),
            &grid_env,
            bbox,
            crosses_dateline,
            stride,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        extrema: Option<Extrema>,
        rows: usize,
        cols: usize,
        grid_env: &BoundingBox,
        bbox: &BoundingBox,
        crosses_dateline: bool,
        stride: usize,
    ) -> Result<HorizontalWindow> {
        let ((r0, r1), (c0, c1)) = match extrema {
            Some(e) => e,
            None => {
                if !envelopes_intersect(bbox, grid_env, crosses_dateline) {
                    return Err(SubsetError::EmptyIntersection {
                        requested: bbox.cache_key(),
                        grid: grid_env.cache_key(),
                    });
                }
                warn!(
                    bbox = %bbox.cache_key(),
                    "No grid cell inside box; using full grid"
                );
                return HorizontalWindow::full(rows, cols, stride);
            }
        };

        let (n_rows, n_cols) = (r1 - r0 + 1, c1 - c0 + 1);
        if n_rows < self.min_window_cells || n_cols < self.min_window_cells {
            warn!(
                rows = n_rows,
                cols = n_cols,
                min = self.min_window_cells,
                "Selection too small; using full grid"
            );
            return HorizontalWindow::full(rows, cols, stride);
        }

        let window = HorizontalWindow::new(
            IndexWindow::new(r0, r1 + 1, stride)?,
            IndexWindow::new(c0, c1 + 1, stride)?,
        );
        debug!(window = %window, "Computed index window");
        Ok(window)
    }
}

fn lat_selected(lat: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.south && lat <= bbox.north
}

fn lon_selected(lon: f64, bbox: &BoundingBox, crosses_dateline: bool) -> bool {
    if crosses_dateline {
        lon >= bbox.west || lon <= bbox.east
    } else {
        lon >= bbox.west && lon <= bbox.east
    }
}

fn cell_selected(lat: f64, lon: f64, bbox: &BoundingBox, crosses_dateline: bool) -> bool {
    lat_selected(lat, bbox) && lon_selected(lon, bbox, crosses_dateline)
}

fn index_extrema(selected: impl Iterator<Item = bool>) -> Option<(usize, usize)> {
    selected
        .enumerate()
        .filter(|(_, s)| *s)
        .fold(None, |acc, (i, _)| match acc {
            None => Some((i, i)),
            Some((lo, _)) => Some((lo, i)),
        })
}

fn envelopes_intersect(bbox: &BoundingBox, grid_env: &BoundingBox, crosses_dateline: bool) -> bool {
    let lat_overlap = bbox.south <= grid_env.north && bbox.north >= grid_env.south;
    let lon_overlap = if crosses_dateline {
        grid_env.east >= bbox.west || grid_env.west <= bbox.east
    } else {
        bbox.west <= grid_env.east && bbox.east >= grid_env.west
    };
    lat_overlap && lon_overlap
}
