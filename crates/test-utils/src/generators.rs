//! Test data generators for synthetic ocean model datasets.
//!
//! These generators create predictable, verifiable data patterns so that
//! subset output can be compared value by value against its source.

use dataset_access::{ArrayData, AttributeValue, DatasetResult, MemoryDataset};

use crate::fixtures::time::{HYCOM_TIME_UNITS, ROMS_TIME_UNITS};

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Value stored at `(time, level, row, col)` of a generated 4-D field.
///
/// Exactly representable as `f32` for the sizes used in tests.
pub fn field_value(t: usize, k: usize, row: usize, col: usize) -> f32 {
    (t * 1_000_000 + k * 10_000 + row * 100 + col) as f32
}

fn field(times: usize, levels: usize, rows: usize, cols: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(times * levels * rows * cols);
    for t in 0..times {
        for k in 0..levels {
            for r in 0..rows {
                for c in 0..cols {
                    data.push(field_value(t, k, r, c));
                }
            }
        }
    }
    data
}

// ============================================================================
// ROMS (curvilinear, Arakawa-C staggered)
// ============================================================================

/// Shape and placement of a synthetic ROMS grid.
///
/// Center coordinates are a sheared lattice, so neither latitude nor
/// longitude is constant along a grid row or column:
///
/// `lat(r, c) = lat0 + r*dlat + c*shear`, `lon(r, c) = lon0 + c*dlon - r*shear`
#[derive(Debug, Clone, Copy)]
pub struct RomsSpec {
    pub eta_rho: usize,
    pub xi_rho: usize,
    pub s_rho: usize,
    pub times: usize,
    pub lat0: f64,
    pub lon0: f64,
    pub dlat: f64,
    pub dlon: f64,
    pub shear: f64,
    /// Seconds between time steps.
    pub time_step: f64,
}

impl Default for RomsSpec {
    fn default() -> Self {
        Self {
            eta_rho: 12,
            xi_rho: 10,
            s_rho: 3,
            times: 6,
            lat0: 27.0,
            lon0: -83.2,
            dlat: 0.1,
            dlon: 0.1,
            shear: 0.02,
            time_step: 3600.0,
        }
    }
}

impl RomsSpec {
    pub fn lat(&self, row: usize, col: usize) -> f64 {
        self.lat0 + row as f64 * self.dlat + col as f64 * self.shear
    }

    pub fn lon(&self, row: usize, col: usize) -> f64 {
        self.lon0 + col as f64 * self.dlon - row as f64 * self.shear
    }

    /// Row-major center latitudes and longitudes.
    pub fn center_coordinates(&self) -> (Vec<f64>, Vec<f64>) {
        let mut lat = Vec::with_capacity(self.eta_rho * self.xi_rho);
        let mut lon = Vec::with_capacity(self.eta_rho * self.xi_rho);
        for r in 0..self.eta_rho {
            for c in 0..self.xi_rho {
                lat.push(self.lat(r, c));
                lon.push(self.lon(r, c));
            }
        }
        (lat, lon)
    }
}

/// Staggered coordinates averaged from the center lattice.
fn staggered(spec: &RomsSpec, row_off: usize, col_off: usize) -> (Vec<f64>, Vec<f64>) {
    let (rows, cols) = (spec.eta_rho - row_off, spec.xi_rho - col_off);
    let mut lat = Vec::with_capacity(rows * cols);
    let mut lon = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let (r1, c1) = (r + row_off, c + col_off);
            lat.push((spec.lat(r, c) + spec.lat(r1, c1)) / 2.0);
            lon.push((spec.lon(r, c) + spec.lon(r1, c1)) / 2.0);
        }
    }
    (lat, lon)
}

/// Build an in-memory ROMS dataset with every grid family, vertical grid
/// variables, a time axis and `u`, `v` and `zeta` fields.
pub fn create_roms_dataset(spec: &RomsSpec) -> DatasetResult<MemoryDataset> {
    let mut ds = MemoryDataset::new("mem://roms");
    let (eta, xi, n) = (spec.eta_rho, spec.xi_rho, spec.s_rho);

    ds.add_dimension("ocean_time", spec.times)?
        .add_dimension("s_rho", n)?
        .add_dimension("s_w", n + 1)?;
    for (suffix, rows, cols) in [
        ("rho", eta, xi),
        ("u", eta, xi - 1),
        ("v", eta - 1, xi),
        ("psi", eta - 1, xi - 1),
    ] {
        ds.add_dimension(&format!("eta_{}", suffix), rows)?
            .add_dimension(&format!("xi_{}", suffix), cols)?;
    }

    // Horizontal grid
    let (lat, lon) = spec.center_coordinates();
    let families = [
        ("rho", (lat, lon)),
        ("u", staggered(spec, 0, 1)),
        ("v", staggered(spec, 1, 0)),
        ("psi", staggered(spec, 1, 1)),
    ];
    for (suffix, (lat, lon)) in families {
        let (eta_dim, xi_dim) = (format!("eta_{}", suffix), format!("xi_{}", suffix));
        let dims = [eta_dim.as_str(), xi_dim.as_str()];
        let mask = vec![1.0f64; lat.len()];

        ds.add_variable(&format!("lat_{}", suffix), &dims, ArrayData::F64(lat))?
            .add_variable(&format!("lon_{}", suffix), &dims, ArrayData::F64(lon))?
            .add_variable(&format!("mask_{}", suffix), &dims, ArrayData::F64(mask))?;
        ds.set_attribute(&format!("lat_{}", suffix), "units", "degree_north")?
            .set_attribute(&format!("lon_{}", suffix), "units", "degree_east")?
            .set_attribute(&format!("mask_{}", suffix), "flag_values", AttributeValue::Doubles(vec![0.0, 1.0]))?;
    }

    let rho = ["eta_rho", "xi_rho"];
    ds.add_variable("angle", &rho, ArrayData::F64(vec![0.1; eta * xi]))?;
    let h: Vec<f64> = (0..eta)
        .flat_map(|r| (0..xi).map(move |c| 10.0 + r as f64 + c as f64))
        .collect();
    ds.add_variable("h", &rho, ArrayData::F64(h))?;
    ds.set_attribute("h", "units", "meter")?;

    // Vertical grid
    let s_rho: Vec<f64> = (0..n).map(|k| -1.0 + (k as f64 + 0.5) / n as f64).collect();
    let cs_r: Vec<f64> = s_rho.iter().map(|s| s * 0.9).collect();
    ds.add_variable("hc", &[], ArrayData::F64(vec![5.0]))?
        .add_variable("s_rho", &["s_rho"], ArrayData::F64(s_rho))?
        .add_variable("Cs_r", &["s_rho"], ArrayData::F64(cs_r))?;
    ds.set_attribute("s_rho", "positive", "up")?;

    // Time
    let times: Vec<f64> = (0..spec.times).map(|t| t as f64 * spec.time_step).collect();
    ds.add_variable("ocean_time", &["ocean_time"], ArrayData::F64(times))?;
    ds.set_attribute("ocean_time", "units", ROMS_TIME_UNITS)?
        .set_attribute("ocean_time", "calendar", "gregorian")?;

    // Fields
    for (name, suffix, rows, cols) in [("u", "u", eta, xi - 1), ("v", "v", eta - 1, xi)] {
        let (eta_dim, xi_dim) = (format!("eta_{}", suffix), format!("xi_{}", suffix));
        let dims = ["ocean_time", "s_rho", eta_dim.as_str(), xi_dim.as_str()];
        ds.add_variable(name, &dims, ArrayData::F32(field(spec.times, n, rows, cols)))?;
        ds.set_attribute(
            name,
            "coordinates",
            format!("lon_{0} lat_{0} s_rho ocean_time", suffix),
        )?
        .set_attribute(name, "units", "meter second-1")?
        .set_attribute(name, "_FillValue", 1.0e37f32)?;
    }
    ds.add_variable(
        "zeta",
        &["ocean_time", "eta_rho", "xi_rho"],
        ArrayData::F32(field(spec.times, 1, eta, xi)),
    )?;
    ds.set_attribute("zeta", "coordinates", "lon_rho lat_rho ocean_time")?;

    ds.set_global_attribute("title", "Synthetic ROMS test grid")
        .set_global_attribute("type", "ROMS/TOMS history file")
        .set_global_attribute("history", "generated by test-utils");
    Ok(ds)
}

// ============================================================================
// Rectangular (HYCOM-style)
// ============================================================================

/// Shape and placement of a synthetic rectangular lat/lon grid.
#[derive(Debug, Clone, Copy)]
pub struct RectangularSpec {
    pub lat_len: usize,
    pub lon_len: usize,
    pub depths: usize,
    pub times: usize,
    pub lat0: f64,
    pub lon0: f64,
    pub step: f64,
}

impl Default for RectangularSpec {
    fn default() -> Self {
        Self {
            lat_len: 20,
            lon_len: 30,
            depths: 4,
            times: 5,
            lat0: 10.0,
            lon0: 260.0,
            step: 0.5,
        }
    }
}

impl RectangularSpec {
    pub fn lat_axis(&self) -> Vec<f64> {
        (0..self.lat_len).map(|i| self.lat0 + i as f64 * self.step).collect()
    }

    pub fn lon_axis(&self) -> Vec<f64> {
        (0..self.lon_len).map(|i| self.lon0 + i as f64 * self.step).collect()
    }
}

/// Build an in-memory HYCOM-style dataset with `water_u` and `water_v`.
pub fn create_rectangular_dataset(spec: &RectangularSpec) -> DatasetResult<MemoryDataset> {
    let mut ds = MemoryDataset::new("mem://hycom");
    ds.add_dimension("time", spec.times)?
        .add_dimension("depth", spec.depths)?
        .add_dimension("lat", spec.lat_len)?
        .add_dimension("lon", spec.lon_len)?;

    ds.add_variable("lat", &["lat"], ArrayData::F64(spec.lat_axis()))?
        .add_variable("lon", &["lon"], ArrayData::F64(spec.lon_axis()))?
        .add_variable(
            "depth",
            &["depth"],
            ArrayData::F64((0..spec.depths).map(|k| k as f64 * 10.0).collect()),
        )?
        .add_variable(
            "time",
            &["time"],
            ArrayData::F64((0..spec.times).map(|t| 140_000.0 + t as f64 * 3.0).collect()),
        )?;
    ds.set_attribute("time", "units", HYCOM_TIME_UNITS)?
        .set_attribute("lat", "units", "degrees_north")?
        .set_attribute("lon", "units", "degrees_east")?
        .set_attribute("depth", "positive", "down")?;

    let dims = ["time", "depth", "lat", "lon"];
    for name in ["water_u", "water_v"] {
        let data = field(spec.times, spec.depths, spec.lat_len, spec.lon_len);
        ds.add_variable(name, &dims, ArrayData::F32(data))?;
        ds.set_attribute(name, "units", "m/s")?
            .set_attribute(name, "_FillValue", -30000.0f32)?;
    }

    ds.set_global_attribute("title", "Synthetic HYCOM test grid");
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset_access::{AxisSlice, DatasetSource};

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0); // col=0, row=0
        assert_eq!(grid[1], 1000.0); // col=1, row=0
        assert_eq!(grid[10], 1.0); // col=0, row=1
        assert_eq!(grid[11], 1001.0); // col=1, row=1
    }

    #[test]
    fn test_roms_shapes() {
        let spec = RomsSpec::default();
        let ds = create_roms_dataset(&spec).unwrap();

        assert_eq!(ds.variable("lon_rho").unwrap().shape, vec![12, 10]);
        assert_eq!(ds.variable("lon_u").unwrap().shape, vec![12, 9]);
        assert_eq!(ds.variable("lon_v").unwrap().shape, vec![11, 10]);
        assert_eq!(ds.variable("lon_psi").unwrap().shape, vec![11, 9]);
        assert_eq!(ds.variable("u").unwrap().shape, vec![6, 3, 12, 9]);
        assert_eq!(ds.variable("hc").unwrap().rank(), 0);
        assert_eq!(
            ds.variable("u").unwrap().attribute_str("coordinates"),
            Some("lon_u lat_u s_rho ocean_time")
        );
    }

    #[test]
    fn test_roms_field_values() {
        let ds = create_roms_dataset(&RomsSpec::default()).unwrap();
        let slices = [
            AxisSlice::index(2),
            AxisSlice::index(1),
            AxisSlice::index(4),
            AxisSlice::index(7),
        ];
        assert_eq!(
            ds.read("u", &slices).unwrap(),
            ArrayData::F32(vec![field_value(2, 1, 4, 7)])
        );
    }

    #[test]
    fn test_roms_grid_is_sheared() {
        let spec = RomsSpec::default();
        assert!(spec.lat(0, 0) != spec.lat(0, 1));
        assert!(spec.lon(0, 0) != spec.lon(1, 0));
    }

    #[test]
    fn test_rectangular_axes() {
        let spec = RectangularSpec::default();
        let ds = create_rectangular_dataset(&spec).unwrap();
        assert_eq!(ds.read_all("lon").unwrap().to_f64_vec(), spec.lon_axis());
        assert_eq!(ds.variable("water_u").unwrap().shape, vec![5, 4, 20, 30]);
    }
}
