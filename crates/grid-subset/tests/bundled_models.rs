//! The model registry shipped under `config/models`.

use std::path::PathBuf;

use grid_subset::{DepthSelection, GridKind, ModelRegistry, TimePolicy};

fn models_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/models")
}

#[test]
fn test_bundled_models_load() {
    let registry = ModelRegistry::load_dir(models_dir()).unwrap();
    assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["CBOFS", "HYCOM", "TBOFS"]);

    let hycom = registry.get("HYCOM").unwrap();
    assert_eq!(hycom.grid_kind, GridKind::Rectangular);
    assert_eq!(hycom.time_policy, TimePolicy::All);
    assert_eq!(hycom.depth, DepthSelection::Level(0));
    assert_eq!(hycom.variables.data_variables().collect::<Vec<_>>(), vec!["water_u", "water_v"]);

    let tbofs = registry.get("TBOFS").unwrap();
    assert_eq!(tbofs.grid_kind, GridKind::Curvilinear);
    assert_eq!(tbofs.time_policy, TimePolicy::Latest { steps: 72 });
    assert_eq!(tbofs.depth, DepthSelection::Level(-1));
    assert_eq!(tbofs.variables.time, "ocean_time");

    let cbofs = registry.get("CBOFS").unwrap();
    assert_eq!(cbofs.depth, DepthSelection::Level(-1));
}

#[test]
fn test_example_boxes_inside_domains() {
    let registry = ModelRegistry::load_dir(models_dir()).unwrap();
    for model in registry.iter() {
        let example = model.example_bbox.unwrap();
        assert!(
            model.bounding_box.intersects(&example),
            "{} example box outside its domain",
            model.id
        );
    }
}

#[test]
fn test_url_override_from_env() {
    std::env::set_var("TBOFS_URL", "/data/tbofs_local.nc");
    let registry = ModelRegistry::load_dir(models_dir()).unwrap();
    std::env::remove_var("TBOFS_URL");

    assert_eq!(registry.get("TBOFS").unwrap().url, "/data/tbofs_local.nc");
    assert!(registry.get("HYCOM").unwrap().url.starts_with("https://tds.hycom.org/"));
}
