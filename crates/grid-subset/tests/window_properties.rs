//! Properties of index windows computed over synthetic grids.

use goods_common::{BoundingBox, BoundingRegion, CfTimeUnits};
use grid_subset::time_window::resolve;
use grid_subset::{
    GridDescriptor, GridIndexer, GridKind, HorizontalWindow, PointFamily, SubsetConfig,
    SubsetError, SubsetRequest, Subsetter, VariableMapping,
};
use test_utils::{
    assert_approx_eq, assert_coords_approx_eq, bbox, bbox_of, create_rectangular_dataset,
    create_roms_dataset, RectangularSpec, RomsSpec,
};

fn roms_descriptor(spec: &RomsSpec) -> GridDescriptor {
    let ds = create_roms_dataset(spec).unwrap();
    GridDescriptor::load(&ds, GridKind::Curvilinear, &VariableMapping::roms()).unwrap()
}

fn window(descriptor: &GridDescriptor, bbox: &BoundingBox) -> HorizontalWindow {
    descriptor
        .family
        .compute_window(&GridIndexer::default(), bbox, false, 1)
        .unwrap()
}

fn selected_cells(spec: &RomsSpec, bbox: &BoundingBox) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    for r in 0..spec.eta_rho {
        for c in 0..spec.xi_rho {
            if bbox.contains_point(spec.lon(r, c), spec.lat(r, c)) {
                cells.push((r, c));
            }
        }
    }
    cells
}

#[test]
fn test_window_is_minimal_superset_on_sheared_grid() {
    let spec = RomsSpec::default();
    let descriptor = roms_descriptor(&spec);
    let boxes = [
        bbox_of(bbox::ROMS_INTERIOR),
        BoundingBox::new(-83.1, 27.2, -82.7, 27.6),
        BoundingBox::new(-82.9, 27.6, -82.4, 28.1),
        BoundingBox::new(-83.3, 27.0, -82.9, 27.4),
    ];

    for bbox in boxes {
        let w = window(&descriptor, &bbox);
        let cells = selected_cells(&spec, &bbox);
        assert!(!cells.is_empty(), "box {:?} selects nothing", bbox);

        for &(r, c) in &cells {
            assert!(w.rows.start <= r && r < w.rows.end, "row {} outside {}", r, w);
            assert!(w.cols.start <= c && c < w.cols.end, "col {} outside {}", c, w);
        }

        if w.rows.is_full(spec.eta_rho) && w.cols.is_full(spec.xi_rho) {
            continue;
        }
        // Every window edge touches a selected cell
        assert!(cells.iter().any(|&(r, _)| r == w.rows.start));
        assert!(cells.iter().any(|&(r, _)| r == w.rows.end - 1));
        assert!(cells.iter().any(|&(_, c)| c == w.cols.start));
        assert!(cells.iter().any(|&(_, c)| c == w.cols.end - 1));
    }
}

#[test]
fn test_full_extent_box_returns_full_grid() {
    let spec = RomsSpec::default();
    let descriptor = roms_descriptor(&spec);
    let env = descriptor.envelope().unwrap();
    let nudged = BoundingBox::new(env.west + 1e-4, env.south - 1e-4, env.east, env.north + 1e-4);

    let w = window(&descriptor, &nudged);
    assert_eq!(w, HorizontalWindow::full(spec.eta_rho, spec.xi_rho, 1).unwrap());

    let rect = RectangularSpec::default();
    let ds = create_rectangular_dataset(&rect).unwrap();
    let descriptor = GridDescriptor::load(&ds, GridKind::Rectangular, &VariableMapping::hycom()).unwrap();
    let env = descriptor.envelope().unwrap();
    assert_coords_approx_eq!((env.west, env.south), (rect.lon0, rect.lat0), 1e-9);
    assert_approx_eq!(env.east, rect.lon0 + rect.step * (rect.lon_len - 1) as f64, 1e-9);
    assert_approx_eq!(env.north, rect.lat0 + rect.step * (rect.lat_len - 1) as f64, 1e-9);
    let w = window(&descriptor, &env);
    assert_eq!(w, HorizontalWindow::full(rect.lat_len, rect.lon_len, 1).unwrap());
}

#[test]
fn test_staggered_windows_follow_center() {
    let spec = RomsSpec::default();
    let descriptor = roms_descriptor(&spec);

    // Interior box and one touching the last row and column
    let corner = BoundingBox::new(-82.7, 27.9, -82.0, 28.5);
    for bbox in [bbox_of(bbox::ROMS_INTERIOR), corner] {
        let center = window(&descriptor, &bbox);
        let windows = descriptor.family.family_windows(&center).unwrap();
        assert_eq!(windows.len(), 4);

        for family in PointFamily::ALL {
            let w = windows.get(family).unwrap();
            let (dr, dc) = family.offset();
            assert_eq!(w.rows.start, center.rows.start);
            assert_eq!(w.cols.start, center.cols.start);
            assert_eq!(w.rows.end, center.rows.end - dr);
            assert_eq!(w.cols.end, center.cols.end - dc);
            assert!(w.rows.end <= spec.eta_rho - dr);
            assert!(w.cols.end <= spec.xi_rho - dc);
        }
    }
}

#[test]
fn test_strided_window_keeps_bounds() {
    let descriptor = roms_descriptor(&RomsSpec::default());
    let bbox = bbox_of(bbox::ROMS_INTERIOR);
    let unit = window(&descriptor, &bbox);
    let strided = descriptor
        .family
        .compute_window(&GridIndexer::default(), &bbox, false, 2)
        .unwrap();

    assert_eq!((strided.rows.start, strided.rows.end), (unit.rows.start, unit.rows.end));
    assert_eq!(strided.rows.stride, 2);
    assert_eq!(strided.rows.len(), (unit.rows.len() + 1) / 2);
}

#[test]
fn test_full_time_range_resolves_whole_axis() {
    let units = CfTimeUnits::parse("hours since 2000-01-01 00:00:00").unwrap();
    let values: Vec<f64> = (0..8).map(|i| 140_000.0 + 3.0 * i as f64).collect();

    let start = units.decode(values[0]).unwrap();
    let end = units.decode(values[7]).unwrap();
    for stride in [1, 3] {
        let w = resolve(&values, &units, start, end, stride).unwrap();
        assert_eq!((w.start, w.end, w.stride), (0, 8, stride));
    }

    // Bounds between steps round inward
    let start = units.decode(140_001.0).unwrap();
    let end = units.decode(140_011.0).unwrap();
    let w = resolve(&values, &units, start, end, 1).unwrap();
    assert_eq!((w.start, w.end), (1, 4));
}

#[test]
fn test_ring_region_matches_box() {
    let ds = create_roms_dataset(&RomsSpec::default()).unwrap();
    let mapping = VariableMapping::roms();
    let descriptor = GridDescriptor::load(&ds, GridKind::Curvilinear, &mapping).unwrap();
    let subsetter = Subsetter::new(SubsetConfig::default()).unwrap();

    let bbox = bbox_of(bbox::ROMS_INTERIOR);
    let ring = BoundingRegion::Ring(bbox.to_ring().to_vec());
    let from_box = subsetter
        .plan(&ds, None, &descriptor, &mapping, &SubsetRequest::new(bbox))
        .unwrap();
    let from_ring = subsetter
        .plan(&ds, None, &descriptor, &mapping, &SubsetRequest::new(ring))
        .unwrap();
    assert_eq!(from_box.windows, from_ring.windows);

    let triangle = BoundingRegion::Ring(vec![(-82.9, 27.4), (-82.6, 27.4), (-82.75, 27.7)]);
    let err = subsetter
        .plan(&ds, None, &descriptor, &mapping, &SubsetRequest::new(triangle))
        .unwrap_err();
    assert!(matches!(err, SubsetError::IncompatibleBounds(_)));
}

#[test]
fn test_box_outside_grid_is_empty_intersection() {
    let descriptor = roms_descriptor(&RomsSpec::default());
    let err = descriptor
        .family
        .compute_window(
            &GridIndexer::default(),
            &bbox_of(bbox::SOUTH_ATLANTIC),
            false,
            1,
        )
        .unwrap_err();
    assert!(matches!(err, SubsetError::EmptyIntersection { .. }));
}
