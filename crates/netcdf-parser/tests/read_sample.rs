//! Reads a real downscaled precipitation file when one is available.
//!
//! Place `pr_day_sample.nc` under `testdata/` (or point `TEST_DATA_DIR` at it)
//! and run with `--features native`.

#![cfg(feature = "native")]

use netcdf_parser::{read_daily_field, DailyField};
use test_utils::require_test_file;

#[test]
fn test_read_pr_sample() {
    let path = require_test_file!("pr_day_sample.nc");
    netcdf_parser::silence_hdf5_errors();

    let mut field = read_daily_field(&path, "pr").unwrap();
    let (nt, ny, nx) = field.shape();
    assert!(nt > 0 && ny > 0 && nx > 0);
    assert!(field.times.windows(2).all(|w| w[0] < w[1]));

    field.convert_precipitation().unwrap();
    assert_eq!(field.units, "mm/day");

    let (grid, series) = field.into_grid().unwrap();
    assert_eq!(series.shape(), (grid.nt(), grid.ny(), grid.nx()));
}

#[test]
fn test_concat_single_file_is_identity() {
    let path = require_test_file!("pr_day_sample.nc");
    let field = read_daily_field(&path, "pr").unwrap();
    let shape = field.shape();

    let merged = DailyField::concat(vec![field]).unwrap();
    assert_eq!(merged.shape(), shape);
}

#[test]
fn test_missing_variable_is_an_error() {
    let path = require_test_file!("pr_day_sample.nc");
    assert!(read_daily_field(&path, "not_a_variable").is_err());
}
