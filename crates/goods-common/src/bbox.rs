//! Bounding box types and coordinate normalization.
//!
//! Query regions arrive either as an axis-aligned box or as a ring of
//! `(lon, lat)` vertices. The canonical form used by the grid indexer is
//! always [`BoundingBox`]; rings are collapsed with [`box_from_ring`] and
//! rejected when they do not describe a rectangle.

use serde::{Deserialize, Serialize};

use crate::error::{Axis, CoordinateError, CoordinateResult};

/// Corner matching tolerance when checking that a ring is a rectangle.
const RING_CORNER_TOLERANCE: f64 = 1e-9;

/// A geographic bounding box in degrees.
///
/// `west > east` denotes a box that crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a new bounding box from edge coordinates.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Create a box from lower-left and upper-right `(lon, lat)` corners.
    pub fn from_corners(lower_left: (f64, f64), upper_right: (f64, f64)) -> Self {
        Self::new(lower_left.0, lower_left.1, upper_right.0, upper_right.1)
    }

    /// Create a box and validate every edge.
    pub fn validated(west: f64, south: f64, east: f64, north: f64) -> CoordinateResult<Self> {
        let bbox = Self::new(west, south, east, north);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Parse a `"west,south,east,north"` string.
    pub fn from_lonlat_string(s: &str) -> CoordinateResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CoordinateError::shape(format!(
                "'{}': expected 'west,south,east,north'",
                s
            )));
        }

        let mut values = [0.0_f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| CoordinateError::shape(format!("'{}' is not a number", part)))?;
        }

        Self::validated(values[0], values[1], values[2], values[3])
    }

    /// Validate latitude/longitude ranges and edge ordering.
    pub fn validate(&self) -> CoordinateResult<()> {
        validate_latitude(self.south)?;
        validate_latitude(self.north)?;
        validate_longitude(self.west)?;
        validate_longitude(self.east)?;
        if self.south > self.north {
            return Err(CoordinateError::shape(format!(
                "south edge {} is above north edge {}",
                self.south, self.north
            )));
        }
        Ok(())
    }

    pub fn lower_left(&self) -> (f64, f64) {
        (self.west, self.south)
    }

    pub fn upper_right(&self) -> (f64, f64) {
        (self.east, self.north)
    }

    /// Whether the longitude span wraps through the antimeridian.
    pub fn crosses_dateline(&self) -> bool {
        self.west > self.east
    }

    /// Check if a point is contained within this bbox, honoring dateline wrap.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.crosses_dateline() {
            lon >= self.west || lon <= self.east
        } else {
            lon >= self.west && lon <= self.east
        }
    }

    /// Check if this bbox intersects another non-wrapping envelope.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let lat_overlap = self.south <= other.north && self.north >= other.south;
        if !lat_overlap {
            return false;
        }
        if self.crosses_dateline() {
            other.east >= self.west || other.west <= self.east
        } else {
            self.west <= other.east && self.east >= other.west
        }
    }

    /// Edge-wise comparison with an absolute tolerance in degrees.
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        (self.west - other.west).abs() < tolerance
            && (self.south - other.south).abs() < tolerance
            && (self.east - other.east).abs() < tolerance
            && (self.north - other.north).abs() < tolerance
    }

    /// Shift negative longitudes into a 0-360 grid's domain when needed.
    pub fn rotate_if_needed(&self, convention: &LongitudeConvention) -> Self {
        if convention.max_lon > 180.0 && self.east < convention.min_lon {
            let shift = |lon: f64| if lon < 0.0 { lon + 360.0 } else { lon };
            Self::new(shift(self.west), self.south, shift(self.east), self.north)
        } else {
            *self
        }
    }

    /// Ring view of this box.
    pub fn to_ring(&self) -> [(f64, f64); 4] {
        ring_from_box(self)
    }

    /// Generate a cache key fragment for this bbox (quantized to avoid floating point issues).
    pub fn cache_key(&self) -> String {
        format!(
            "{:.6}_{:.6}_{:.6}_{:.6}",
            self.west, self.south, self.east, self.north
        )
    }
}

/// Longitude domain a grid uses, taken from its own coordinate values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LongitudeConvention {
    pub min_lon: f64,
    pub max_lon: f64,
}

impl LongitudeConvention {
    pub fn new(min_lon: f64, max_lon: f64) -> Self {
        Self { min_lon, max_lon }
    }

    /// Derive the convention from longitude values, ignoring NaN.
    ///
    /// Returns `None` when there is no finite value.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut range: Option<(f64, f64)> = None;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            range = Some(match range {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        range.map(|(lo, hi)| Self::new(lo, hi))
    }

    /// True for grids stored in the [0, 360) convention.
    pub fn is_0_360(&self) -> bool {
        self.max_lon > 180.0
    }
}

/// A query region as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundingRegion {
    Box(BoundingBox),
    Ring(Vec<(f64, f64)>),
}

impl BoundingRegion {
    /// Canonicalize to an axis-aligned box.
    ///
    /// Rings must be the four corners of their own bounding box (a repeated
    /// closing vertex is allowed).
    pub fn to_box(&self) -> CoordinateResult<BoundingBox> {
        match self {
            BoundingRegion::Box(bbox) => {
                bbox.validate()?;
                Ok(*bbox)
            }
            BoundingRegion::Ring(points) => {
                let bbox = box_from_ring(points)?;
                if !is_rectangular(points, &bbox) {
                    return Err(CoordinateError::non_rectangular(format!(
                        "{} vertices do not form the corners of {}",
                        points.len(),
                        bbox.cache_key()
                    )));
                }
                Ok(bbox)
            }
        }
    }
}

impl From<BoundingBox> for BoundingRegion {
    fn from(bbox: BoundingBox) -> Self {
        BoundingRegion::Box(bbox)
    }
}

/// Fails unless `-90 < lat < 90`.
pub fn validate_latitude(lat: f64) -> CoordinateResult<()> {
    if lat > -90.0 && lat < 90.0 {
        Ok(())
    } else {
        Err(CoordinateError::Range {
            axis: Axis::Latitude,
            value: lat,
            expected: "-90 < lat < 90",
        })
    }
}

/// Fails unless `-180 <= lon <= 360`; both conventions are accepted here.
pub fn validate_longitude(lon: f64) -> CoordinateResult<()> {
    if (-180.0..=360.0).contains(&lon) {
        Ok(())
    } else {
        Err(CoordinateError::Range {
            axis: Axis::Longitude,
            value: lon,
            expected: "-180 <= lon <= 360",
        })
    }
}

/// Axis-aligned bounding box of a ring of `(lon, lat)` points.
pub fn box_from_ring(points: &[(f64, f64)]) -> CoordinateResult<BoundingBox> {
    for (i, (lon, lat)) in points.iter().enumerate() {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(CoordinateError::shape(format!(
                "point {} ({}, {}) is not a numeric pair",
                i, lon, lat
            )));
        }
    }

    let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for p in points {
        if !distinct.contains(p) {
            distinct.push(*p);
        }
    }
    if distinct.len() < 3 {
        return Err(CoordinateError::shape(format!(
            "need at least 3 distinct points, got {}",
            distinct.len()
        )));
    }

    let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for &(lon, lat) in &distinct {
        validate_longitude(lon)?;
        validate_latitude(lat)?;
        bbox.west = bbox.west.min(lon);
        bbox.east = bbox.east.max(lon);
        bbox.south = bbox.south.min(lat);
        bbox.north = bbox.north.max(lat);
    }
    Ok(bbox)
}

/// Closed rectangle in upper-left, upper-right, lower-right, lower-left order.
pub fn ring_from_box(bbox: &BoundingBox) -> [(f64, f64); 4] {
    [
        (bbox.west, bbox.north),
        (bbox.east, bbox.north),
        (bbox.east, bbox.south),
        (bbox.west, bbox.south),
    ]
}

fn is_rectangular(points: &[(f64, f64)], bbox: &BoundingBox) -> bool {
    let corners = ring_from_box(bbox);
    let near = |a: (f64, f64), b: (f64, f64)| {
        (a.0 - b.0).abs() <= RING_CORNER_TOLERANCE && (a.1 - b.1).abs() <= RING_CORNER_TOLERANCE
    };

    let mut seen = [false; 4];
    for &p in points {
        match corners.iter().position(|&c| near(c, p)) {
            Some(i) => seen[i] = true,
            None => return false,
        }
    }
    seen.iter().all(|s| *s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_from_box_order() {
        let bbox = BoundingBox::from_corners((-88.0, 23.0), (-87.0, 24.0));
        assert_eq!(
            ring_from_box(&bbox),
            [(-88.0, 24.0), (-87.0, 24.0), (-87.0, 23.0), (-88.0, 23.0)]
        );
    }

    #[test]
    fn test_box_from_ring() {
        let ring = [(-130.0, 45.0), (-130.0, 50.0), (-125.0, 50.0), (-125.0, 45.0)];
        let bbox = box_from_ring(&ring).unwrap();
        assert_eq!(bbox.lower_left(), (-130.0, 45.0));
        assert_eq!(bbox.upper_right(), (-125.0, 50.0));
    }

    #[test]
    fn test_box_from_ring_too_few_points() {
        let err = box_from_ring(&[(-130.0, 45.0), (-125.0, 50.0)]).unwrap_err();
        assert!(matches!(err, CoordinateError::Shape(_)));

        // A closing duplicate does not count as a distinct point
        let err = box_from_ring(&[(-130.0, 45.0), (-125.0, 50.0), (-130.0, 45.0)]).unwrap_err();
        assert!(matches!(err, CoordinateError::Shape(_)));
    }

    #[test]
    fn test_box_from_ring_malformed_point() {
        let err = box_from_ring(&[(-130.0, 45.0), (f64::NAN, 50.0), (-125.0, 50.0)]).unwrap_err();
        assert!(matches!(err, CoordinateError::Shape(_)));
    }

    #[test]
    fn test_rotate_if_needed() {
        let grid = LongitudeConvention::new(0.0, 359.92);
        let bbox = BoundingBox::new(-90.0, 20.0, -80.0, 30.0);
        // east (-80) < grid min (0) so both negative edges shift
        let rotated = bbox.rotate_if_needed(&grid);
        assert_eq!(rotated.west, 270.0);
        assert_eq!(rotated.east, 280.0);
        assert_eq!(rotated.south, 20.0);

        let pm_grid = LongitudeConvention::new(-180.0, 179.9);
        assert_eq!(bbox.rotate_if_needed(&pm_grid), bbox);
    }
}
