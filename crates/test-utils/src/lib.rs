//! Shared test utilities for the goods-subset workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic ROMS and rectangular datasets
//! - Named bounding boxes and time constants
//! - Approximate-equality assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{create_roms_dataset, fixtures, RomsSpec};
//! ```

pub mod fixtures;
pub mod generators;

use goods_common::BoundingBox;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Convert a `(west, south, east, north)` fixture into a [`BoundingBox`].
pub fn bbox_of((west, south, east, north): (f64, f64, f64, f64)) -> BoundingBox {
    BoundingBox::new(west, south, east, north)
}

/// A fresh temporary directory for subset output, removed on drop.
pub fn output_dir() -> std::io::Result<tempfile::TempDir> {
    tempfile::Builder::new().prefix("goods-subset-").tempdir()
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for approximate equality of coordinate pairs.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_coords_approx_eq;
///
/// assert_coords_approx_eq!((1.0001, 2.0001), (1.0, 2.0), 0.001);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($x1:expr, $y1:expr), ($x2:expr, $y2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($x1, $x2, $epsilon);
        $crate::assert_approx_eq!($y1, $y2, $epsilon);
    }};
}
