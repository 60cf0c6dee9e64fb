//! Secondary windows for Arakawa-C staggered grids.
//!
//! Given the center (rho) window `[r0, r1) x [c0, c1)`:
//!
//! | family | rows          | cols          |
//! |--------|---------------|---------------|
//! | rho    | `[r0, r1)`    | `[c0, c1)`    |
//! | u      | `[r0, r1)`    | `[c0, c1-1)`  |
//! | v      | `[r0, r1-1)`  | `[c0, c1)`    |
//! | psi    | `[r0, r1-1)`  | `[c0, c1-1)`  |
//!
//! Strides carry over unchanged.

use crate::error::Result;
use crate::types::{FamilyWindows, HorizontalWindow, PointFamily};

/// Window for one point family derived from the center window.
pub fn family_window(center: &HorizontalWindow, family: PointFamily) -> Result<HorizontalWindow> {
    let (row_offset, col_offset) = family.offset();
    Ok(HorizontalWindow::new(
        center.rows.shrink_end(row_offset)?,
        center.cols.shrink_end(col_offset)?,
    ))
}

/// Windows for every requested family.
pub fn derive_family_windows<I>(center: &HorizontalWindow, families: I) -> Result<FamilyWindows>
where
    I: IntoIterator<Item = PointFamily>,
{
    let mut windows = FamilyWindows::new();
    for family in families {
        windows.insert(family, family_window(center, family)?);
    }
    Ok(windows)
}
