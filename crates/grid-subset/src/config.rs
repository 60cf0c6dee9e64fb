//! Configuration for the subsetter.

use serde::{Deserialize, Serialize};

/// Tunables for window computation, caching and output limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsetConfig {
    /// Absolute tolerance (degrees) for treating a box as the full grid extent.
    pub full_extent_tolerance: f64,

    /// Minimum rows/columns a selection must cover before falling back to the full grid.
    pub min_window_cells: usize,

    /// Capacity of the index-window cache; 0 disables it.
    pub window_cache_entries: usize,

    /// Refuse subsets whose estimated size exceeds this many megabytes.
    pub max_file_size_mb: Option<u64>,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            full_extent_tolerance: 1e-3,
            min_window_cells: 3,
            window_cache_entries: 64,
            max_file_size_mb: None,
        }
    }
}

impl SubsetConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SUBSET_FULL_EXTENT_TOLERANCE") {
            if let Ok(tol) = val.parse() {
                config.full_extent_tolerance = tol;
            }
        }

        if let Ok(val) = std::env::var("SUBSET_MIN_WINDOW_CELLS") {
            if let Ok(cells) = val.parse() {
                config.min_window_cells = cells;
            }
        }

        if let Ok(val) = std::env::var("SUBSET_WINDOW_CACHE_ENTRIES") {
            if let Ok(entries) = val.parse() {
                config.window_cache_entries = entries;
            }
        }

        if let Ok(val) = std::env::var("SUBSET_MAX_FILE_SIZE_MB") {
            if let Ok(mb) = val.parse() {
                config.max_file_size_mb = Some(mb);
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.full_extent_tolerance.is_nan() || self.full_extent_tolerance < 0.0 {
            return Err("full_extent_tolerance must be >= 0".to_string());
        }

        if self.min_window_cells == 0 {
            return Err("min_window_cells must be > 0".to_string());
        }

        if self.max_file_size_mb == Some(0) {
            return Err("max_file_size_mb must be > 0 when set".to_string());
        }

        Ok(())
    }

    /// Size limit in bytes, if any. Saturates at `u64::MAX`.
    pub fn max_file_size_bytes(&self) -> Option<u64> {
        self.max_file_size_mb.map(|mb| mb.saturating_mul(1024 * 1024))
    }
}
