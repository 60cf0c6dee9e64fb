//! Common types and utilities shared across the goods workspace.

pub mod bbox;
pub mod error;
pub mod time;

pub use bbox::{
    box_from_ring, ring_from_box, validate_latitude, validate_longitude, BoundingBox,
    BoundingRegion, LongitudeConvention,
};
pub use error::{Axis, CoordinateError, CoordinateResult};
pub use time::{parse_iso8601, Calendar, CfTimeUnits, TimeParseError, TimeRange, TimeUnit};
