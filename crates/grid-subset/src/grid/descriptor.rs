//! Grid descriptors for rectangular and staggered curvilinear grids.

use std::collections::BTreeMap;

use dataset_access::{AttributeValue, DatasetSource, VariableInfo};
use goods_common::{BoundingBox, LongitudeConvention};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SubsetError};
use crate::grid::{derive_family_windows, envelope, CoordinateGrid, GridIndexer};
use crate::mapping::VariableMapping;
use crate::types::{FamilyWindows, HorizontalWindow, IndexWindow, PointFamily};

/// Horizontal-only grid variables copied alongside the coordinates when present.
const CURVILINEAR_AUXILIARY: &[&str] = &["angle"];

/// Vertical-grid variables copied only when the vertical axis is kept.
const CURVILINEAR_VERTICAL: &[&str] = &["h", "hc", "Cs_r", "s_rho"];

/// Grid shape tag, as configured per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    Rectangular,
    Curvilinear,
}

impl std::fmt::Display for GridKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridKind::Rectangular => write!(f, "rectangular"),
            GridKind::Curvilinear => write!(f, "curvilinear"),
        }
    }
}

/// A separable grid with 1-D latitude (rows) and longitude (columns) axes.
#[derive(Debug, Clone, PartialEq)]
pub struct RectangularGrid {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub lat_var: String,
    pub lon_var: String,
    pub row_dim: String,
    pub col_dim: String,
}

/// Coordinate variables and dimensions of one point family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyGrid {
    pub family: PointFamily,
    pub lon_var: String,
    pub lat_var: String,
    pub mask_var: Option<String>,
    pub row_dim: String,
    pub col_dim: String,
    pub rows: usize,
    pub cols: usize,
}

/// A 2-D grid with center coordinates and optional staggered families.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvilinearGrid {
    pub lat: CoordinateGrid,
    pub lon: CoordinateGrid,
    pub families: BTreeMap<PointFamily, FamilyGrid>,
}

impl CurvilinearGrid {
    /// The family a coordinate variable or dimension name belongs to.
    fn family_by_name(&self, name: &str) -> Option<PointFamily> {
        self.families
            .values()
            .find(|f| f.lon_var == name || f.lat_var == name)
            .map(|f| f.family)
    }

    fn family_by_dims(&self, row_dim: &str, col_dim: &str) -> Option<PointFamily> {
        self.families
            .values()
            .find(|f| f.row_dim == row_dim && f.col_dim == col_dim)
            .map(|f| f.family)
    }
}

/// Grid variants handled by the subsetting pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum GridFamily {
    Rectangular(RectangularGrid),
    Curvilinear(CurvilinearGrid),
}

/// A grid variable to copy into the subset output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridVariable {
    pub name: String,
    /// Missing required variables are errors; optional ones are skipped.
    pub required: bool,
}

impl GridVariable {
    fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
        }
    }

    fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
        }
    }
}

impl GridFamily {
    pub fn kind(&self) -> GridKind {
        match self {
            GridFamily::Rectangular(_) => GridKind::Rectangular,
            GridFamily::Curvilinear(_) => GridKind::Curvilinear,
        }
    }

    /// Center-family `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            GridFamily::Rectangular(g) => (g.lat.len(), g.lon.len()),
            GridFamily::Curvilinear(g) => g.lat.shape(),
        }
    }

    /// Index computation: center window covering `bbox`.
    pub fn compute_window(
        &self,
        indexer: &GridIndexer,
        bbox: &BoundingBox,
        crosses_dateline: bool,
        stride: usize,
    ) -> Result<HorizontalWindow> {
        match self {
            GridFamily::Rectangular(g) => {
                indexer.compute_window_rectilinear(&g.lat, &g.lon, bbox, crosses_dateline, stride)
            }
            GridFamily::Curvilinear(g) => {
                indexer.compute_window(&g.lat, &g.lon, bbox, crosses_dateline, stride)
            }
        }
    }

    /// Staggered-window derivation: one window per family present on the grid.
    pub fn family_windows(&self, center: &HorizontalWindow) -> Result<FamilyWindows> {
        match self {
            GridFamily::Rectangular(_) => derive_family_windows(center, [PointFamily::Rho]),
            GridFamily::Curvilinear(g) => {
                let windows = derive_family_windows(center, g.families.keys().copied())?;
                for (family, window) in windows.iter() {
                    if let Some(fg) = g.families.get(family) {
                        window.rows.within(fg.rows)?;
                        window.cols.within(fg.cols)?;
                    }
                }
                Ok(windows)
            }
        }
    }

    /// Coordinate slicing: the grid variables to copy.
    pub fn grid_variables(&self, keep_vertical: bool, depth_var: Option<&str>) -> Vec<GridVariable> {
        match self {
            GridFamily::Rectangular(g) => {
                let mut vars = vec![
                    GridVariable::required(&g.lat_var),
                    GridVariable::required(&g.lon_var),
                ];
                if keep_vertical {
                    if let Some(depth) = depth_var {
                        vars.push(GridVariable::optional(depth));
                    }
                }
                vars
            }
            GridFamily::Curvilinear(g) => {
                let mut vars = Vec::new();
                for fg in g.families.values() {
                    let required = fg.family == PointFamily::Rho;
                    vars.push(GridVariable {
                        name: fg.lon_var.clone(),
                        required,
                    });
                    vars.push(GridVariable {
                        name: fg.lat_var.clone(),
                        required,
                    });
                    if let Some(mask) = &fg.mask_var {
                        vars.push(GridVariable::optional(mask));
                    }
                }
                vars.extend(CURVILINEAR_AUXILIARY.iter().map(|n| GridVariable::optional(n)));
                if keep_vertical {
                    vars.extend(CURVILINEAR_VERTICAL.iter().map(|n| GridVariable::optional(n)));
                }
                vars
            }
        }
    }

    /// Coordinate slicing: the window applied to a horizontal dimension, if `dim` is one.
    pub fn horizontal_slice(&self, dim: &str, windows: &FamilyWindows) -> Option<IndexWindow> {
        match self {
            GridFamily::Rectangular(g) => {
                let w = windows.center()?;
                if dim == g.row_dim {
                    Some(w.rows)
                } else if dim == g.col_dim {
                    Some(w.cols)
                } else {
                    None
                }
            }
            GridFamily::Curvilinear(g) => g.families.values().find_map(|fg| {
                let w = windows.get(fg.family)?;
                if dim == fg.row_dim {
                    Some(w.rows)
                } else if dim == fg.col_dim {
                    Some(w.cols)
                } else {
                    None
                }
            }),
        }
    }

    /// The point family a data variable lives on.
    ///
    /// Curvilinear grids check the `coordinates` attribute first, then the
    /// trailing two dimension names.
    pub fn resolve_family(&self, var: &VariableInfo) -> Result<PointFamily> {
        let trailing = trailing_dims(var);
        match self {
            GridFamily::Rectangular(g) => match trailing {
                Some((row, col)) if row == g.row_dim && col == g.col_dim => Ok(PointFamily::Rho),
                _ => Err(SubsetError::unresolved_family(&var.name)),
            },
            GridFamily::Curvilinear(g) => {
                let from_coords = var.attribute_str("coordinates").and_then(|coords| {
                    coords
                        .split_whitespace()
                        .find_map(|token| g.family_by_name(token))
                });
                let from_dims = trailing.and_then(|(row, col)| g.family_by_dims(row, col));

                match (from_coords, from_dims) {
                    (Some(a), Some(b)) if a == b => Ok(a),
                    (Some(a), None) | (None, Some(a)) if trailing_match(g, a, trailing) => Ok(a),
                    _ => Err(SubsetError::unresolved_family(&var.name)),
                }
            }
        }
    }

    /// Attribute copy: attributes verbatim, minus dropped vertical coordinates.
    pub fn output_attributes(
        &self,
        var: &VariableInfo,
        dropped_coordinates: &[&str],
    ) -> Vec<(String, AttributeValue)> {
        var.attributes
            .iter()
            .filter_map(|(name, value)| {
                if name != "coordinates" || dropped_coordinates.is_empty() {
                    return Some((name.clone(), value.clone()));
                }
                let coords = value.as_str()?;
                let kept: Vec<&str> = coords
                    .split_whitespace()
                    .filter(|t| !dropped_coordinates.contains(t))
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some((name.clone(), AttributeValue::Str(kept.join(" "))))
                }
            })
            .collect()
    }
}

fn trailing_dims(var: &VariableInfo) -> Option<(&str, &str)> {
    match var.dimensions.as_slice() {
        [.., row, col] => Some((row.as_str(), col.as_str())),
        _ => None,
    }
}

fn trailing_match(g: &CurvilinearGrid, family: PointFamily, trailing: Option<(&str, &str)>) -> bool {
    match (g.families.get(&family), trailing) {
        (Some(fg), Some((row, col))) => fg.row_dim == row && fg.col_dim == col,
        _ => false,
    }
}

/// Immutable description of one model grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDescriptor {
    pub source_id: String,
    pub family: GridFamily,
    pub longitude: LongitudeConvention,
}

impl GridDescriptor {
    /// Load grid coordinates from `source` using the mapped lat/lon names.
    pub fn load(
        source: &dyn DatasetSource,
        kind: GridKind,
        mapping: &VariableMapping,
    ) -> Result<Self> {
        let family = match kind {
            GridKind::Rectangular => GridFamily::Rectangular(load_rectangular(source, mapping)?),
            GridKind::Curvilinear => GridFamily::Curvilinear(load_curvilinear(source, mapping)?),
        };

        let lon_values: &[f64] = match &family {
            GridFamily::Rectangular(g) => &g.lon,
            GridFamily::Curvilinear(g) => g.lon.values(),
        };
        let longitude = LongitudeConvention::from_values(lon_values.iter().copied())
            .ok_or_else(|| SubsetError::invalid_grid("longitude has no finite values"))?;

        let (rows, cols) = family.shape();
        info!(
            source = %source.identifier(),
            kind = %kind,
            rows,
            cols,
            "Loaded grid descriptor"
        );

        Ok(Self {
            source_id: source.identifier().to_string(),
            family,
            longitude,
        })
    }

    pub fn kind(&self) -> GridKind {
        self.family.kind()
    }

    /// Lat/lon envelope of the center family.
    pub fn envelope(&self) -> Result<BoundingBox> {
        match &self.family {
            GridFamily::Rectangular(g) => envelope(&g.lat, &g.lon),
            GridFamily::Curvilinear(g) => envelope(g.lat.values(), g.lon.values()),
        }
    }
}

fn require(source: &dyn DatasetSource, name: &str) -> Result<VariableInfo> {
    source
        .variable(name)
        .ok_or_else(|| SubsetError::variable_not_found(name, source.identifier()))
}

fn load_rectangular(source: &dyn DatasetSource, mapping: &VariableMapping) -> Result<RectangularGrid> {
    let lat_info = require(source, &mapping.lat)?;
    let lon_info = require(source, &mapping.lon)?;
    for info in [&lat_info, &lon_info] {
        if info.rank() != 1 {
            return Err(SubsetError::invalid_grid(format!(
                "rectangular grid coordinate '{}' has {} dimensions; expected 1",
                info.name,
                info.rank()
            )));
        }
    }

    Ok(RectangularGrid {
        lat: source.read_all(&mapping.lat)?.to_f64_vec(),
        lon: source.read_all(&mapping.lon)?.to_f64_vec(),
        lat_var: mapping.lat.clone(),
        lon_var: mapping.lon.clone(),
        row_dim: lat_info.dimensions[0].clone(),
        col_dim: lon_info.dimensions[0].clone(),
    })
}

fn load_curvilinear(source: &dyn DatasetSource, mapping: &VariableMapping) -> Result<CurvilinearGrid> {
    let lat_info = require(source, &mapping.lat)?;
    let lon_info = require(source, &mapping.lon)?;
    if lat_info.rank() != 2 || lat_info.shape != lon_info.shape {
        return Err(SubsetError::invalid_grid(format!(
            "curvilinear coordinates must be matching 2-D arrays, got {:?} and {:?}",
            lat_info.shape, lon_info.shape
        )));
    }
    let (rows, cols) = (lat_info.shape[0], lat_info.shape[1]);

    let lat = CoordinateGrid::new(rows, cols, source.read_all(&mapping.lat)?.to_f64_vec())?;
    let lon = CoordinateGrid::new(rows, cols, source.read_all(&mapping.lon)?.to_f64_vec())?;

    let mut families = BTreeMap::new();
    let center_mask = PointFamily::Rho.mask_name();
    families.insert(
        PointFamily::Rho,
        FamilyGrid {
            family: PointFamily::Rho,
            lon_var: mapping.lon.clone(),
            lat_var: mapping.lat.clone(),
            mask_var: source.has_variable(&center_mask).then_some(center_mask),
            row_dim: lon_info.dimensions[0].clone(),
            col_dim: lon_info.dimensions[1].clone(),
            rows,
            cols,
        },
    );

    for family in [PointFamily::U, PointFamily::V, PointFamily::Psi] {
        let (lon_name, lat_name) = (family.lon_name(), family.lat_name());
        let (Some(flon), Some(_)) = (source.variable(&lon_name), source.variable(&lat_name)) else {
            debug!(family = %family, "Point family not present on grid");
            continue;
        };

        let (row_off, col_off) = family.offset();
        let expected = vec![rows.saturating_sub(row_off), cols.saturating_sub(col_off)];
        if flon.shape != expected {
            return Err(SubsetError::invalid_grid(format!(
                "{} has shape {:?}; expected {:?} from center shape {:?}",
                lon_name,
                flon.shape,
                expected,
                (rows, cols)
            )));
        }

        let mask_name = family.mask_name();
        families.insert(
            family,
            FamilyGrid {
                family,
                lon_var: lon_name,
                lat_var: lat_name,
                mask_var: source.has_variable(&mask_name).then_some(mask_name),
                row_dim: flon.dimensions[0].clone(),
                col_dim: flon.dimensions[1].clone(),
                rows: expected[0],
                cols: expected[1],
            },
        );
    }

    Ok(CurvilinearGrid { lat, lon, families })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset_access::DataType;

    fn var(name: &str, dims: &[&str], coords: Option<&str>) -> VariableInfo {
        VariableInfo {
            name: name.to_string(),
            dimensions: dims.iter().map(|d| d.to_string()).collect(),
            shape: vec![1; dims.len()],
            data_type: DataType::F32,
            attributes: coords
                .map(|c| vec![("coordinates".to_string(), AttributeValue::from(c))])
                .unwrap_or_default(),
        }
    }

    fn roms_family() -> GridFamily {
        let mut families = BTreeMap::new();
        for (family, rows, cols) in [
            (PointFamily::Rho, 4, 5),
            (PointFamily::U, 4, 4),
            (PointFamily::V, 3, 5),
            (PointFamily::Psi, 3, 4),
        ] {
            families.insert(
                family,
                FamilyGrid {
                    family,
                    lon_var: family.lon_name(),
                    lat_var: family.lat_name(),
                    mask_var: Some(family.mask_name()),
                    row_dim: format!("eta_{}", family.suffix()),
                    col_dim: format!("xi_{}", family.suffix()),
                    rows,
                    cols,
                },
            );
        }
        GridFamily::Curvilinear(CurvilinearGrid {
            lat: CoordinateGrid::from_axis(&[0.0, 1.0, 2.0, 3.0], 5, true),
            lon: CoordinateGrid::from_axis(&[0.0, 1.0, 2.0, 3.0, 4.0], 4, false),
            families,
        })
    }

    #[test]
    fn test_resolve_family_from_coordinates() {
        let grid = roms_family();
        let u = var(
            "u",
            &["ocean_time", "s_rho", "eta_u", "xi_u"],
            Some("lon_u lat_u s_rho ocean_time"),
        );
        assert_eq!(grid.resolve_family(&u).unwrap(), PointFamily::U);

        let v = var("v", &["ocean_time", "eta_v", "xi_v"], Some("lon_v lat_v ocean_time"));
        assert_eq!(grid.resolve_family(&v).unwrap(), PointFamily::V);
    }

    #[test]
    fn test_resolve_family_from_dimensions() {
        let grid = roms_family();
        let zeta = var("zeta", &["ocean_time", "eta_rho", "xi_rho"], None);
        assert_eq!(grid.resolve_family(&zeta).unwrap(), PointFamily::Rho);
    }

    #[test]
    fn test_resolve_family_unresolved() {
        let grid = roms_family();
        let odd = var("odd", &["ocean_time", "station"], Some("station_lon"));
        assert!(matches!(
            grid.resolve_family(&odd),
            Err(SubsetError::UnresolvedGridFamily { .. })
        ));

        // Attribute and dimensions disagree
        let bad = var("bad", &["ocean_time", "eta_rho", "xi_rho"], Some("lon_u lat_u"));
        assert!(grid.resolve_family(&bad).is_err());
    }

    #[test]
    fn test_output_attributes_strip_vertical() {
        let grid = roms_family();
        let mut u = var("u", &["ocean_time", "s_rho", "eta_u", "xi_u"], Some("lon_u lat_u s_rho ocean_time"));
        u.attributes
            .push(("units".to_string(), AttributeValue::from("meter second-1")));

        let attrs = grid.output_attributes(&u, &["s_rho", "s_w"]);
        assert_eq!(
            attrs[0],
            ("coordinates".to_string(), AttributeValue::from("lon_u lat_u ocean_time"))
        );
        assert_eq!(attrs[1].0, "units");

        // Nothing stripped when the vertical axis is kept
        let attrs = grid.output_attributes(&u, &[]);
        assert_eq!(attrs[0].1.as_str(), Some("lon_u lat_u s_rho ocean_time"));
    }

    #[test]
    fn test_horizontal_slice_by_dimension() {
        let grid = roms_family();
        let center = HorizontalWindow::new(
            IndexWindow::new(1, 4, 1).unwrap(),
            IndexWindow::new(0, 4, 1).unwrap(),
        );
        let windows = grid.family_windows(&center).unwrap();

        assert_eq!(
            grid.horizontal_slice("xi_psi", &windows),
            Some(IndexWindow::new(0, 3, 1).unwrap())
        );
        assert_eq!(
            grid.horizontal_slice("eta_v", &windows),
            Some(IndexWindow::new(1, 3, 1).unwrap())
        );
        assert_eq!(grid.horizontal_slice("s_rho", &windows), None);
    }

    #[test]
    fn test_grid_variables_vertical_extras() {
        let grid = roms_family();
        let flat: Vec<String> = grid
            .grid_variables(false, Some("s_rho"))
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert!(flat.contains(&"lon_psi".to_string()));
        assert!(flat.contains(&"mask_u".to_string()));
        assert!(flat.contains(&"angle".to_string()));
        assert!(!flat.contains(&"Cs_r".to_string()));

        let full: Vec<String> = grid
            .grid_variables(true, Some("s_rho"))
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert!(full.contains(&"Cs_r".to_string()));
        assert!(full.contains(&"h".to_string()));
    }
}
