use std::fs;

use climate_indices::{IndexRegistry, Spread};
use indices_runner::load_run_config;
use test_utils::temp_test_dir;

#[test]
fn test_load_full_config_file() {
    let dir = temp_test_dir();
    let path = dir.path().join("climate_indices.yml");
    fs::write(
        &path,
        r#"
region: { lat_min: -35, lat_max: -21, lon_min: 16, lon_max: 33 }
run_indices: [cdd, cwd, r10mm]
cdd:   { threshold_mm: 1.0,  aggregation: annual }
cwd:   { threshold_mm: 1.0,  aggregation: seasonal }
r10mm: { threshold_mm: 10.0, aggregation: monthly }
experiments:
  select: [historical, ssp245]
  time_ranges: { ssp245: { start_year: 2015, end_year: 2100 } }
time: { start_year: 1950, end_year: 2014 }
ensemble: { spread: sample }
output: { dir: "${INDICES_CONFIG_TEST_OUT:-data/outputs}", raster: false }
"#,
    )
    .unwrap();

    let plan = load_run_config(&path)
        .unwrap()
        .validate(&IndexRegistry::with_builtins())
        .unwrap();

    assert_eq!(plan.index_names(), vec!["cdd", "cwd", "r10mm"]);
    assert_eq!(plan.experiments.len(), 2);
    assert_eq!(plan.ensemble.spread(), Spread::Sample);
    assert!(!plan.output.raster);
    assert_eq!(plan.output.dir.to_str(), Some("data/outputs"));
    assert!(plan.region.is_some());
}

#[test]
fn test_missing_file_names_path() {
    let dir = temp_test_dir();
    let path = dir.path().join("absent.yml");
    let err = load_run_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.yml"));
}

#[test]
fn test_unknown_index_rejected_at_validation() {
    let dir = temp_test_dir();
    let path = dir.path().join("bad.yml");
    fs::write(&path, "run_indices: [sdii]\nexperiments: { select: [historical] }\n").unwrap();

    let config = load_run_config(&path).unwrap();
    let err = config.validate(&IndexRegistry::with_builtins()).unwrap_err();
    assert_eq!(err.kind(), "config_invalid");
}

#[test]
fn test_shipped_config_validates() {
    let path = test_utils::workspace_root().join("config").join("climate_indices.yml");
    let plan = load_run_config(&path)
        .unwrap()
        .validate(&IndexRegistry::with_builtins())
        .unwrap();

    assert_eq!(plan.index_names(), vec!["cdd", "cwd", "r10mm"]);
    assert_eq!(plan.ensemble.spread(), Spread::Population);
    assert!(plan.biomes.is_some());
}
