//! Common test fixtures for subsetting tests.
//!
//! Boxes are `(west, south, east, north)` tuples in degrees.

/// Common bounding box definitions for testing.
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// TBOFS model domain
    pub const TAMPA_BAY: (f64, f64, f64, f64) = (-83.172, 27.077, -82.354, 28.031);

    /// Interior of the default synthetic ROMS grid
    pub const ROMS_INTERIOR: (f64, f64, f64, f64) = (-82.95, 27.35, -82.6, 27.75);

    /// Interior of the default synthetic rectangular grid, in -180..180 longitudes
    pub const HYCOM_INTERIOR: (f64, f64, f64, f64) = (-98.0, 12.0, -94.0, 15.0);

    /// Crosses antimeridian (Pacific-centric)
    pub const DATELINE: (f64, f64, f64, f64) = (170.0, -10.0, -170.0, 10.0);

    /// Far from every synthetic grid
    pub const SOUTH_ATLANTIC: (f64, f64, f64, f64) = (-20.0, -40.0, -10.0, -30.0);

    /// Invalid bbox (latitude out of range)
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 91.0, 20.0, 95.0);
}

/// Common time values for testing.
pub mod time {
    /// A fixed reference time for tests, matching the ROMS epoch.
    pub const REFERENCE_TIME: &str = "2016-01-01T00:00:00Z";

    /// Units of the synthetic ROMS `ocean_time` axis
    pub const ROMS_TIME_UNITS: &str = "seconds since 2016-01-01 00:00:00";

    /// Units of the synthetic HYCOM `time` axis
    pub const HYCOM_TIME_UNITS: &str = "hours since 2000-01-01 00:00:00";
}

/// Common model identifiers.
pub mod models {
    pub const TBOFS: &str = "TBOFS";
    pub const CBOFS: &str = "CBOFS";
    pub const HYCOM: &str = "HYCOM";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxes_are_ordered() {
        for (w, s, e, n) in [bbox::TAMPA_BAY, bbox::ROMS_INTERIOR, bbox::HYCOM_INTERIOR] {
            assert!(w < e);
            assert!(s < n);
        }
        let (w, _, e, _) = bbox::DATELINE;
        assert!(w > e, "dateline box wraps");
    }
}
