//! Property checks for the built-in indices, driven through the registry.

use std::collections::BTreeMap;

use climate_common::{Aggregation, BoundingBox, DailySeries, Grid, SeriesView, TimeRange};
use climate_indices::{IndexRegistry, RegionMask, ResolvedIndex};
use test_utils::{
    assert_nan, point_grid, random_precip_series, regular_grid, single_wet_day_series,
    uniform_series,
};

fn resolve(name: &str, aggregation: Aggregation) -> ResolvedIndex {
    IndexRegistry::with_builtins()
        .resolve(name, Some(aggregation), &BTreeMap::new())
        .unwrap()
}

fn compute(name: &str, aggregation: Aggregation, grid: &Grid, series: &DailySeries) -> Vec<f32> {
    let view = SeriesView::new(grid, series).unwrap();
    resolve(name, aggregation)
        .compute(view, &RegionMask::full(grid))
        .unwrap()
        .values
}

// ============================================================================
// Uniform series
// ============================================================================

#[test]
fn test_uniformly_wet_series() {
    // 2003 and 2004: one common and one leap year
    let grid = regular_grid(-30.0, -29.0, 20.0, 21.0, 1.0, 2003, 2);
    let series = uniform_series(&grid, 3.0);

    let cdd = compute("cdd", Aggregation::Annual, &grid, &series);
    assert!(cdd.iter().all(|&v| v == 0.0));

    let cwd = compute("cwd", Aggregation::Annual, &grid, &series);
    assert_eq!(&cwd[..4], &[365.0; 4]);
    assert_eq!(&cwd[4..], &[366.0; 4]);
}

#[test]
fn test_uniformly_dry_series() {
    let grid = regular_grid(-30.0, -29.0, 20.0, 21.0, 1.0, 2004, 1);
    let series = uniform_series(&grid, 0.5);

    let cdd = compute("cdd", Aggregation::Monthly, &grid, &series);
    let per_month: Vec<f32> = cdd.chunks(4).map(|c| c[0]).collect();
    assert_eq!(
        per_month,
        vec![31.0, 29.0, 31.0, 30.0, 31.0, 30.0, 31.0, 31.0, 30.0, 31.0, 30.0, 31.0]
    );

    let cwd = compute("cwd", Aggregation::Monthly, &grid, &series);
    assert!(cwd.iter().all(|&v| v == 0.0));
}

#[test]
fn test_isolated_wet_day_splits_dry_spell() {
    let grid = point_grid(-33.9, 18.4, 2001, 365);
    let series = single_wet_day_series(&grid, 100, 5.0);
    assert_eq!(compute("cdd", Aggregation::Annual, &grid, &series), vec![264.0]);
    assert_eq!(compute("cwd", Aggregation::Annual, &grid, &series), vec![1.0]);
    assert_eq!(compute("r10mm", Aggregation::Annual, &grid, &series), vec![0.0]);
}

#[test]
fn test_truncated_final_period_is_nan() {
    let grid = point_grid(0.0, 0.0, 2001, 365);
    let series = uniform_series(&grid, 0.0);
    let view = SeriesView::new(&grid, &series)
        .unwrap()
        .with_window(Some(TimeRange::years(2001, 2002).unwrap()));

    let result = resolve("cdd", Aggregation::Annual)
        .compute(view, &RegionMask::full(&grid))
        .unwrap();
    assert_eq!(result.n_periods(), 2);
    assert_eq!(result.values[0], 365.0);
    assert_nan!(result.values[1]);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_repeated_computation_is_bit_identical() {
    let grid = regular_grid(-35.0, -30.0, 18.0, 24.0, 0.5, 2000, 3);
    let series = random_precip_series(&grid, 42, 0.3, 6.0);
    let bbox = BoundingBox::new(-34.0, -31.0, 19.0, 22.0);
    let mask = RegionMask::from_bbox(&grid, &bbox, "region").unwrap();

    for name in ["cdd", "cwd", "r10mm", "r20mm"] {
        for aggregation in [Aggregation::Annual, Aggregation::Seasonal, Aggregation::Monthly] {
            let index = resolve(name, aggregation);
            let view = SeriesView::new(&grid, &series).unwrap();
            let first = index.compute(view, &mask).unwrap();
            let second = index.compute(view, &mask).unwrap();
            assert!(first.bit_identical(&second), "{} {} differs", name, aggregation);
        }
    }
}

#[test]
fn test_cells_are_independent_of_mask_extent() {
    let grid = regular_grid(-35.0, -33.0, 18.0, 20.0, 1.0, 2001, 1);
    let series = random_precip_series(&grid, 7, 0.4, 4.0);
    let view = SeriesView::new(&grid, &series).unwrap();
    let index = resolve("cdd", Aggregation::Annual);

    let full = index.compute(view, &RegionMask::full(&grid)).unwrap();
    let mut cells = vec![false; grid.n_cells()];
    cells[4] = true;
    let single = RegionMask::from_cells(grid.ny(), grid.nx(), cells).unwrap();
    let partial = index.compute(view, &single).unwrap();

    assert_eq!(partial.values[4].to_bits(), full.values[4].to_bits());
    assert_nan!(partial.values[0]);
}
