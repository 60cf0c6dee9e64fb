//! End-to-end subsets written to netCDF and read back.

use dataset_access::{
    ArrayData, AttributeValue, AxisSlice, DatasetError, DatasetResult, DatasetSource,
    MemoryDataset, NetcdfSource, VariableInfo,
};
use grid_subset::{
    partial_path, DepthSelection, GridDescriptor, GridKind, SubsetConfig, SubsetError,
    SubsetRequest, Subsetter, TimeSelection, VariableMapping,
};
use test_utils::{
    assert_coords_approx_eq, bbox_of, create_rectangular_dataset, create_roms_dataset,
    create_test_grid, fixtures, output_dir, RectangularSpec, RomsSpec,
};

fn roms() -> (MemoryDataset, GridDescriptor, VariableMapping) {
    let ds = create_roms_dataset(&RomsSpec::default()).unwrap();
    let mapping = VariableMapping::roms();
    let descriptor = GridDescriptor::load(&ds, GridKind::Curvilinear, &mapping).unwrap();
    (ds, descriptor, mapping)
}

fn subsetter() -> Subsetter {
    Subsetter::new(SubsetConfig::default()).unwrap()
}

#[test]
fn test_roms_subset_matches_source_slices() {
    let (ds, descriptor, mapping) = roms();
    let subsetter = subsetter();
    let request = SubsetRequest::new(bbox_of(fixtures::bbox::ROMS_INTERIOR))
        .with_time(TimeSelection::Latest(3))
        .with_depth(DepthSelection::Level(-1));

    let dir = output_dir().unwrap();
    let dest = dir.path().join("roms_subset.nc");
    let plan = subsetter
        .plan(&ds, None, &descriptor, &mapping, &request)
        .unwrap();
    let path = subsetter
        .subset(&ds, None, &descriptor, &mapping, &request, &dest)
        .unwrap();
    assert_eq!(path, dest);
    assert!(!partial_path(&dest).exists());

    let out = NetcdfSource::open_path(&path).unwrap();
    for var in &plan.variables {
        let expected = ds.read(&var.name, &var.slices).unwrap();
        let actual = out.read_all(&var.name).unwrap();
        assert_eq!(actual, expected, "variable {}", var.name);
    }

    // Window is a strict subset of the grid
    let center = plan.windows.center().unwrap();
    assert!(!center.rows.is_full(12) || !center.cols.is_full(10));
}

#[test]
fn test_roms_output_layout() {
    let (ds, descriptor, mapping) = roms();
    let request = SubsetRequest::new(bbox_of(fixtures::bbox::ROMS_INTERIOR))
        .with_time(TimeSelection::Latest(3))
        .with_depth(DepthSelection::Level(-1));

    let dir = output_dir().unwrap();
    let path = subsetter()
        .subset(&ds, None, &descriptor, &mapping, &request, &dir.path().join("out.nc"))
        .unwrap();
    let out = NetcdfSource::open_path(&path).unwrap();

    let rho_rows = out.dimension_len("eta_rho").unwrap();
    let rho_cols = out.dimension_len("xi_rho").unwrap();
    assert_eq!(out.dimension_len("eta_psi"), Some(rho_rows - 1));
    assert_eq!(out.dimension_len("xi_psi"), Some(rho_cols - 1));
    assert_eq!(out.dimension_len("eta_u"), Some(rho_rows));
    assert_eq!(out.dimension_len("xi_u"), Some(rho_cols - 1));
    assert_eq!(out.dimension_len("eta_v"), Some(rho_rows - 1));
    assert_eq!(out.dimension_len("ocean_time"), Some(3));
    assert_eq!(out.dimension_len("s_rho"), None);

    let u = out.variable("u").unwrap();
    assert_eq!(u.dimensions, vec!["ocean_time", "eta_u", "xi_u"]);
    assert_eq!(u.attribute_str("coordinates"), Some("lon_u lat_u ocean_time"));
    assert_eq!(
        u.attribute("_FillValue").and_then(AttributeValue::as_f64),
        Some(1.0e37f32 as f64)
    );
    assert_eq!(u.attribute_str("units"), Some("meter second-1"));

    // Last three hourly steps
    assert_eq!(
        out.read_all("ocean_time").unwrap(),
        ArrayData::F64(vec![10800.0, 14400.0, 18000.0])
    );

    assert!(out.has_variable("angle"));
    assert!(out.has_variable("mask_psi"));
    assert!(!out.has_variable("Cs_r"));
    assert!(!out.has_variable("zeta"));

    let globals = out.global_attributes();
    let history = globals
        .iter()
        .find(|(n, _)| n == "history")
        .and_then(|(_, v)| v.as_str())
        .unwrap();
    assert!(history.starts_with("generated by test-utils\n"));
    assert!(history.contains("subset of mem://roms"));
    assert!(globals.iter().any(|(n, _)| n == "title"));
}

#[test]
fn test_roms_all_depths_keeps_vertical_grid() {
    let (ds, descriptor, mapping) = roms();
    let subsetter = subsetter();
    let request = SubsetRequest::new(bbox_of(fixtures::bbox::ROMS_INTERIOR))
        .with_time(TimeSelection::Latest(1))
        .with_depth(DepthSelection::All);

    let dir = output_dir().unwrap();
    let plan = subsetter
        .plan(&ds, None, &descriptor, &mapping, &request)
        .unwrap();
    let path = subsetter
        .subset(&ds, None, &descriptor, &mapping, &request, &dir.path().join("all.nc"))
        .unwrap();
    let out = NetcdfSource::open_path(&path).unwrap();

    assert_eq!(out.dimension_len("s_rho"), Some(3));
    let u = out.variable("u").unwrap();
    assert_eq!(u.dimensions, vec!["ocean_time", "s_rho", "eta_u", "xi_u"]);
    assert_eq!(u.attribute_str("coordinates"), Some("lon_u lat_u s_rho ocean_time"));

    for name in ["h", "hc", "Cs_r", "s_rho"] {
        let slices = &plan.variable(name).unwrap().slices;
        assert_eq!(
            out.read_all(name).unwrap(),
            ds.read(name, slices).unwrap(),
            "variable {}",
            name
        );
    }
}

#[test]
fn test_rectangular_subset_rotates_longitudes() {
    let spec = RectangularSpec::default();
    let ds = create_rectangular_dataset(&spec).unwrap();
    let mapping = VariableMapping::hycom();
    let descriptor = GridDescriptor::load(&ds, GridKind::Rectangular, &mapping).unwrap();
    assert!(descriptor.longitude.is_0_360());

    let request = SubsetRequest::new(bbox_of(fixtures::bbox::HYCOM_INTERIOR))
        .with_time(TimeSelection::All);
    let dir = output_dir().unwrap();
    let path = subsetter()
        .subset(&ds, None, &descriptor, &mapping, &request, &dir.path().join("hycom.nc"))
        .unwrap();
    let out = NetcdfSource::open_path(&path).unwrap();

    // -98..-94 lands on 262..266 in the grid's convention
    let lon = out.read_all("lon").unwrap().to_f64_vec();
    let lat = out.read_all("lat").unwrap().to_f64_vec();
    assert_eq!((lat.len(), lon.len()), (7, 9));
    assert_coords_approx_eq!((lon[0], lat[0]), (262.0, 12.0), 1e-9);
    assert_coords_approx_eq!((lon[8], lat[6]), (266.0, 15.0), 1e-9);

    let water_u = out.variable("water_u").unwrap();
    assert_eq!(water_u.dimensions, vec!["time", "lat", "lon"]);
    assert_eq!(water_u.shape, vec![spec.times, lat.len(), lon.len()]);
    assert!(!out.has_variable("depth"));
}

#[test]
fn test_dateline_flag_ignored_after_rotation() {
    // 160E through 199E, straddling the antimeridian in 0-360 form
    let spec = RectangularSpec {
        lon0: 160.0,
        lon_len: 40,
        step: 1.0,
        ..Default::default()
    };
    let ds = create_rectangular_dataset(&spec).unwrap();
    let mapping = VariableMapping::hycom();
    let descriptor = GridDescriptor::load(&ds, GridKind::Rectangular, &mapping).unwrap();

    let request = SubsetRequest::new(bbox_of((170.0, 12.0, -170.0, 20.0)))
        .with_time(TimeSelection::All)
        .with_cross_dateline(true);
    let plan = subsetter()
        .plan(&ds, None, &descriptor, &mapping, &request)
        .unwrap();

    // 170..190 after rotation, not the whole globe
    let center = plan.windows.center().unwrap();
    assert_eq!((center.cols.start, center.cols.end), (10, 31));
    assert_eq!((center.rows.start, center.rows.end), (2, 11));
}

#[test]
fn test_rectangular_values_follow_window() {
    let spec = RectangularSpec::default();
    let mut ds = create_rectangular_dataset(&spec).unwrap();
    ds.add_variable(
        "sst",
        &["lat", "lon"],
        ArrayData::F32(create_test_grid(spec.lon_len, spec.lat_len)),
    )
    .unwrap();
    let mut mapping = VariableMapping::hycom();
    mapping
        .data
        .insert("sea_surface_temperature".to_string(), "sst".to_string());
    let descriptor = GridDescriptor::load(&ds, GridKind::Rectangular, &mapping).unwrap();

    let subsetter = subsetter();
    let request = SubsetRequest::new(bbox_of(fixtures::bbox::HYCOM_INTERIOR))
        .with_time(TimeSelection::Latest(1))
        .with_stride(2);
    let plan = subsetter
        .plan(&ds, None, &descriptor, &mapping, &request)
        .unwrap();
    let window = *plan.windows.center().unwrap();

    let dir = output_dir().unwrap();
    let path = subsetter
        .subset(&ds, None, &descriptor, &mapping, &request, &dir.path().join("sst.nc"))
        .unwrap();
    let out = NetcdfSource::open_path(&path).unwrap();

    // create_test_grid stores col * 1000 + row
    let expected: Vec<f32> = window
        .rows
        .indices()
        .flat_map(|r| window.cols.indices().map(move |c| (c * 1000 + r) as f32))
        .collect();
    assert_eq!(out.read_all("sst").unwrap(), ArrayData::F32(expected));
    assert_eq!(out.variable("sst").unwrap().dimensions, vec!["lat", "lon"]);
}

#[test]
fn test_empty_intersection_writes_nothing() {
    let (ds, descriptor, mapping) = roms();
    let request = SubsetRequest::new(bbox_of(fixtures::bbox::SOUTH_ATLANTIC));

    let dir = output_dir().unwrap();
    let dest = dir.path().join("none.nc");
    let err = subsetter()
        .subset(&ds, None, &descriptor, &mapping, &request, &dest)
        .unwrap_err();
    assert!(matches!(err, SubsetError::EmptyIntersection { .. }));
    assert!(!dest.exists());
    assert!(!partial_path(&dest).exists());
}

/// Delegates to a dataset but fails reads of one variable.
struct FailingReads<'a> {
    inner: &'a MemoryDataset,
    fail: &'static str,
}

impl DatasetSource for FailingReads<'_> {
    fn identifier(&self) -> &str {
        self.inner.identifier()
    }

    fn variable_names(&self) -> Vec<String> {
        self.inner.variable_names()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.inner.variable(name)
    }

    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.inner.dimension_len(name)
    }

    fn global_attributes(&self) -> Vec<(String, AttributeValue)> {
        self.inner.global_attributes()
    }

    fn read(&self, name: &str, slices: &[AxisSlice]) -> DatasetResult<ArrayData> {
        if name == self.fail {
            return Err(DatasetError::read_failed(name, "connection reset"));
        }
        self.inner.read(name, slices)
    }
}

#[test]
fn test_read_failure_removes_partial_output() {
    let (ds, descriptor, mapping) = roms();
    let failing = FailingReads {
        inner: &ds,
        fail: "v",
    };
    let request = SubsetRequest::new(bbox_of(fixtures::bbox::ROMS_INTERIOR));

    let dir = output_dir().unwrap();
    let dest = dir.path().join("failed.nc");
    let err = subsetter()
        .subset(&failing, None, &descriptor, &mapping, &request, &dest)
        .unwrap_err();
    assert!(matches!(err, SubsetError::SourceIo(_)));
    assert!(!dest.exists());
    assert!(!partial_path(&dest).exists());
}

#[test]
fn test_unresolved_family() {
    let (mut ds, descriptor, mut mapping) = roms();
    ds.add_dimension("station", 4).unwrap();
    ds.add_variable(
        "station_zeta",
        &["ocean_time", "station"],
        ArrayData::F32(vec![0.0; 24]),
    )
    .unwrap();
    mapping
        .data
        .insert("station_elevation".to_string(), "station_zeta".to_string());

    let request = SubsetRequest::new(bbox_of(fixtures::bbox::ROMS_INTERIOR));
    let err = subsetter()
        .plan(&ds, None, &descriptor, &mapping, &request)
        .unwrap_err();
    assert!(matches!(
        err,
        SubsetError::UnresolvedGridFamily { variable } if variable == "station_zeta"
    ));
}

#[test]
fn test_missing_mapped_variable() {
    let (ds, descriptor, mut mapping) = roms();
    mapping
        .data
        .insert("temperature".to_string(), "temp".to_string());

    let request = SubsetRequest::new(bbox_of(fixtures::bbox::ROMS_INTERIOR));
    let err = subsetter()
        .plan(&ds, None, &descriptor, &mapping, &request)
        .unwrap_err();
    assert!(matches!(
        err,
        SubsetError::VariableNotFound { variable, .. } if variable == "temp"
    ));
}

#[test]
fn test_size_limit_checked_before_writing() {
    let spec = RomsSpec {
        eta_rho: 200,
        xi_rho: 200,
        ..Default::default()
    };
    let ds = create_roms_dataset(&spec).unwrap();
    let mapping = VariableMapping::roms();
    let descriptor = GridDescriptor::load(&ds, GridKind::Curvilinear, &mapping).unwrap();
    let subsetter = Subsetter::new(SubsetConfig {
        max_file_size_mb: Some(1),
        ..Default::default()
    })
    .unwrap();

    let envelope = descriptor.envelope().unwrap();
    let request = SubsetRequest::new(envelope).with_depth(DepthSelection::All);
    let dir = output_dir().unwrap();
    let dest = dir.path().join("big.nc");
    let err = subsetter
        .subset(&ds, None, &descriptor, &mapping, &request, &dest)
        .unwrap_err();
    assert!(matches!(err, SubsetError::SubsetTooLarge { limit_mb: 1, .. }));
    assert!(!dest.exists());
}

#[test]
fn test_window_cache_reused_across_requests() {
    let (ds, descriptor, mapping) = roms();
    let subsetter = subsetter();
    let request = SubsetRequest::new(bbox_of(fixtures::bbox::ROMS_INTERIOR));

    let first = subsetter
        .plan(&ds, None, &descriptor, &mapping, &request)
        .unwrap();
    let second = subsetter
        .plan(&ds, None, &descriptor, &mapping, &request.clone().with_time(TimeSelection::Latest(1)))
        .unwrap();
    assert_eq!(first.windows, second.windows);

    let stats = subsetter.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}
