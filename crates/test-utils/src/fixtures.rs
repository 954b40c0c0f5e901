//! Common test fixtures for climate index tests.
//!
//! This module provides pre-defined grids, regions and biome maps that
//! represent common scenarios in index computation.

use chrono::NaiveDate;
use climate_common::Grid;

/// Common bounding box definitions for testing, as
/// `(lat_min, lat_max, lon_min, lon_max)`.
pub mod bbox {
    /// South Africa mainland
    pub const SOUTH_AFRICA: (f64, f64, f64, f64) = (-35.0, -21.0, 16.0, 33.0);

    /// Western Cape winter-rainfall region
    pub const WESTERN_CAPE: (f64, f64, f64, f64) = (-34.9, -30.0, 17.5, 24.0);

    /// Box straddling the antimeridian in 0..360 longitudes
    pub const DATELINE_360: (f64, f64, f64, f64) = (-20.0, -10.0, 170.0, 190.0);

    /// Region in the middle of the ocean, away from any test grid
    pub const MID_ATLANTIC: (f64, f64, f64, f64) = (-5.0, 5.0, -30.0, -20.0);

    /// Invalid bbox (min > max)
    pub const INVALID: (f64, f64, f64, f64) = (-21.0, -35.0, 16.0, 33.0);
}

/// Model names used across test scenarios.
pub mod models {
    pub const ACCESS: &str = "ACCESS-CM2";
    pub const CANESM: &str = "CanESM5";
    pub const MIROC: &str = "MIROC6";
    pub const ALL: [&str; 3] = [ACCESS, CANESM, MIROC];
}

/// Experiment names used across test scenarios.
pub mod experiments {
    pub const HISTORICAL: &str = "historical";
    pub const SSP245: &str = "ssp245";
    pub const SSP585: &str = "ssp585";
}

/// Daily dates covering whole calendar years.
pub fn daily_dates(start_year: i32, years: i32) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(start_year, 1, 1).expect("valid start year");
    let end = NaiveDate::from_ymd_opt(start_year + years, 1, 1).expect("valid end year");
    start.iter_days().take_while(|d| *d < end).collect()
}

/// Regular ascending lat/lon grid with daily steps over whole years.
///
/// Axes run from the minimum to the maximum inclusive in `step` increments.
pub fn regular_grid(
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    step: f64,
    start_year: i32,
    years: i32,
) -> Grid {
    Grid::new(
        axis(lat_min, lat_max, step),
        axis(lon_min, lon_max, step),
        daily_dates(start_year, years),
    )
    .expect("fixture grid is valid")
}

/// A single-cell grid with `days` daily steps from 1 January of `start_year`.
pub fn point_grid(lat: f64, lon: f64, start_year: i32, days: usize) -> Grid {
    let start = NaiveDate::from_ymd_opt(start_year, 1, 1).expect("valid start year");
    Grid::new(vec![lat], vec![lon], start.iter_days().take(days).collect())
        .expect("fixture grid is valid")
}

fn axis(min: f64, max: f64, step: f64) -> Vec<f64> {
    let n = ((max - min) / step).round() as usize + 1;
    (0..n).map(|i| min + i as f64 * step).collect()
}

/// GeoJSON FeatureCollection of axis-aligned rectangular biomes.
///
/// Each entry is `(name, lat_min, lat_max, lon_min, lon_max)`; the name is
/// stored under `property`.
pub fn rectangle_biomes_geojson(property: &str, biomes: &[(&str, f64, f64, f64, f64)]) -> String {
    let features: Vec<String> = biomes
        .iter()
        .map(|(name, lat_min, lat_max, lon_min, lon_max)| {
            format!(
                r#"{{"type":"Feature","properties":{{"{prop}":"{name}"}},"geometry":{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}"#,
                prop = property,
                name = name,
                x0 = lon_min,
                x1 = lon_max,
                y0 = lat_min,
                y1 = lat_max
            )
        })
        .collect();
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_grid_axes() {
        let grid = regular_grid(-35.0, -21.0, 16.0, 33.0, 0.25, 2000, 1);
        assert_eq!(grid.ny(), 57);
        assert_eq!(grid.nx(), 69);
        assert_eq!(grid.nt(), 366);
    }

    #[test]
    fn test_daily_dates_handles_leap_years() {
        assert_eq!(daily_dates(1999, 2).len(), 365 + 366);
    }

    #[test]
    fn test_geojson_fixture_shape() {
        let text = rectangle_biomes_geojson("Veg_Biome", &[("Fynbos", -34.0, -32.0, 18.0, 20.0)]);
        assert!(text.contains(r#""Veg_Biome":"Fynbos""#));
        assert!(text.starts_with(r#"{"type":"FeatureCollection""#));
    }
}
