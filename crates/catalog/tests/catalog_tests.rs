//! Tests for catalog queries and light curves.
//!
//! Covers:
//! - Native (partition) filters combined with row filters
//! - Derived quantities in selections and filters
//! - Lazy light-curve iteration with object and row filters
//! - Loading a directory of catalogs

use std::path::Path;

use catalog::{Catalog, CatalogError, CatalogRegistry, MemoryCatalog, Predicate, Value};

// ============================================================================
// Helper functions
// ============================================================================

const OBJECT_CATALOG: &str = r#"{
    "name": "dc2_object_mini",
    "native_columns": ["tract", "patch"],
    "partitions": [
        {
            "native": {"tract": 4850, "patch": "1,1"},
            "columns": {
                "objectId": [101, 102, 103],
                "ra": [55.1, 55.2, 55.3],
                "dec": [-30.1, -30.2, -30.3],
                "flux_g": [4000.0, 50.0, 800.0],
                "flux_r": [3000.0, 60.0, 1000.0],
                "extendedness": [0, 1, 0]
            }
        },
        {
            "native": {"tract": 4851, "patch": "0,0"},
            "columns": {
                "objectId": [201, 202],
                "ra": [56.1, 56.2],
                "dec": [-31.1, -31.2],
                "flux_g": [5000.0, 10.0],
                "flux_r": [4000.0, 0.0],
                "extendedness": [0, 0]
            }
        }
    ],
    "derived": {
        "mag_g": {"type": "flux_to_mag", "column": "flux_g"},
        "mag_r": {"type": "flux_to_mag", "column": "flux_r"},
        "id": {"type": "alias", "column": "objectId"}
    }
}"#;

const TRUTH_CATALOG: &str = r#"{
    "name": "dc2_truth_mini",
    "light_curves": [
        {
            "object": {"id": 1, "ra": 55.1, "dec": -30.1, "sn_type": "Ia"},
            "mjd": [59580.1, 59581.2, 59582.3, 59583.4],
            "band": ["r", "i", "r", "r"],
            "mag": [22.5, 22.7, 22.1, 23.0]
        },
        {
            "object": {"id": 2, "ra": 56.0, "dec": -31.0, "sn_type": "II"},
            "mjd": [59580.5, 59584.0],
            "band": ["g", "r"],
            "mag": [24.0, 23.5]
        },
        {
            "object": {"id": 3, "ra": 57.0, "dec": -32.0, "sn_type": "Ia"},
            "mjd": [59590.0],
            "band": ["r"],
            "mag": [21.0]
        }
    ]
}"#;

fn objects() -> MemoryCatalog {
    MemoryCatalog::from_json(OBJECT_CATALOG).unwrap()
}

fn truth() -> MemoryCatalog {
    MemoryCatalog::from_json(TRUTH_CATALOG).unwrap()
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn filters(inputs: &[&str]) -> Vec<Predicate> {
    Predicate::parse_all(inputs).unwrap()
}

// ============================================================================
// Column queries
// ============================================================================

#[test]
fn test_all_rows_without_filters() {
    let table = objects().get_quantities(&columns(&["objectId", "ra"]), &[], &[]).unwrap();
    assert_eq!(table.num_rows(), 5);
    assert_eq!(table.numbers("objectId").unwrap(), vec![101.0, 102.0, 103.0, 201.0, 202.0]);
}

#[test]
fn test_native_filter_skips_partitions() {
    let table = objects()
        .get_quantities(&columns(&["objectId"]), &[], &filters(&["tract == 4851"]))
        .unwrap();
    assert_eq!(table.numbers("objectId").unwrap(), vec![201.0, 202.0]);

    let table = objects()
        .get_quantities(&columns(&["objectId"]), &[], &filters(&["patch == '1,1'"]))
        .unwrap();
    assert_eq!(table.num_rows(), 3);
}

#[test]
fn test_row_and_native_filters_are_conjunctive() {
    let table = objects()
        .get_quantities(
            &columns(&["id", "mag_r"]),
            &filters(&["mag_r < 24", "extendedness == 0"]),
            &filters(&["tract >= 4850", "tract < 4851"]),
        )
        .unwrap();
    // flux 3000 → 22.71, flux 1000 → 23.9; 102 is extended and faint
    assert_eq!(table.numbers("id").unwrap(), vec![101.0, 103.0]);
    assert_eq!(table.names(), &["id".to_string(), "mag_r".to_string()]);
}

#[test]
fn test_filter_on_unselected_derived_column() {
    let table = objects()
        .get_quantities(&columns(&["objectId"]), &filters(&["mag_g < 23"]), &[])
        .unwrap();
    assert_eq!(table.numbers("objectId").unwrap(), vec![101.0, 201.0]);
}

#[test]
fn test_zero_flux_gives_nan_magnitude() {
    let table = objects()
        .get_quantities(&columns(&["objectId", "mag_r"]), &[], &filters(&["tract == 4851"]))
        .unwrap();
    assert!(table.numbers("mag_r").unwrap()[1].is_nan());
}

#[test]
fn test_empty_result_keeps_columns() {
    let table = objects()
        .get_quantities(&columns(&["objectId", "ra"]), &[], &filters(&["tract == 1"]))
        .unwrap();
    assert!(table.is_empty());
    assert_eq!(table.names().len(), 2);
}

#[test]
fn test_unknown_columns_fail() {
    let catalog = objects();
    let err = catalog.get_quantities(&columns(&["mag_y"]), &[], &[]).unwrap_err();
    assert!(matches!(err, CatalogError::UnknownColumn(c) if c == "mag_y"));

    let err = catalog
        .get_quantities(&columns(&["ra"]), &filters(&["snr > 5"]), &[])
        .unwrap_err();
    assert!(matches!(err, CatalogError::UnknownColumn(_)));

    // row columns are not native
    let err = catalog
        .get_quantities(&columns(&["ra"]), &[], &filters(&["ra > 5"]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::UnknownColumn(_)));
}

#[test]
fn test_type_mismatch_in_filter() {
    let err = objects()
        .get_quantities(&columns(&["ra"]), &[], &filters(&["patch == 1"]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::TypeMismatch { .. }));
}

// ============================================================================
// Light curves
// ============================================================================

#[test]
fn test_light_curves_filtered_by_object_and_row() {
    let catalog = truth();
    let curves: Vec<_> = catalog
        .light_curves(&filters(&["sn_type == 'Ia'"]), &filters(&["band == 'r'"]))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(curves.len(), 2);
    assert_eq!(curves[0].object["id"], Value::Number(1.0));
    assert_eq!(curves[0].table.numbers("mjd").unwrap(), vec![59580.1, 59582.3, 59583.4]);
    assert_eq!(curves[0].table.names(), &columns(&["mjd", "band", "mag"])[..]);
    assert_eq!(curves[1].table.num_rows(), 1);
}

#[test]
fn test_light_curves_are_lazy() {
    let catalog = truth();
    let mut iter = catalog.light_curves(&[], &[]).unwrap();
    let first = iter.next().unwrap().unwrap();
    assert_eq!(first.table.num_rows(), 4);
    assert_eq!(iter.size_hint().1, Some(2));
}

#[test]
fn test_light_curve_row_filter_columns_checked() {
    let catalog = truth();
    assert!(matches!(
        catalog.light_curves(&[], &filters(&["flux > 0"])).err(),
        Some(CatalogError::UnknownColumn(_))
    ));
    assert!(matches!(
        catalog.light_curves(&filters(&["host_mag < 20"]), &[]).err(),
        Some(CatalogError::UnknownColumn(_))
    ));
}

// ============================================================================
// Registry
// ============================================================================

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_registry_loads_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "objects.json", OBJECT_CATALOG);
    write(dir.path(), "truth.json", TRUTH_CATALOG);
    write(dir.path(), "README.txt", "not a catalog");

    let mut registry = CatalogRegistry::new();
    assert_eq!(registry.load_dir(dir.path()).unwrap(), 2);
    assert_eq!(registry.names(), vec!["dc2_object_mini", "dc2_truth_mini"]);

    let catalog = registry.get("dc2_object_mini").unwrap();
    assert_eq!(catalog.native_quantities(), columns(&["tract", "patch"]));
    assert!(matches!(registry.get("dc2_source"), Err(CatalogError::NotFound(_))));
}

#[test]
fn test_registry_reports_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.json", "{\"name\": ");
    let mut registry = CatalogRegistry::new();
    assert!(matches!(registry.load_dir(dir.path()), Err(CatalogError::Json(_))));
}
