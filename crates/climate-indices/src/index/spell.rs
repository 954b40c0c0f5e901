//! Spell-length indices: consecutive dry days and consecutive wet days.

use climate_common::{ClimateResult, SeriesView};

use super::kernel::{evaluate, Condition, Statistic};
use super::{ClimateIndex, IndexResult, IndexSpec, ParamSpec, THRESHOLD_MM};
use crate::mask::RegionMask;

/// Longest run of days meeting a threshold condition within each period.
#[derive(Debug, Clone)]
pub struct SpellIndex {
    name: &'static str,
    description: &'static str,
    condition: Condition,
    params: [ParamSpec; 1],
}

impl SpellIndex {
    pub fn new(
        name: &'static str,
        description: &'static str,
        condition: Condition,
        default_threshold_mm: f64,
    ) -> Self {
        Self {
            name,
            description,
            condition,
            params: [ParamSpec {
                name: THRESHOLD_MM,
                default: default_threshold_mm,
                description: "daily precipitation threshold in mm/day",
            }],
        }
    }

    /// Consecutive dry days: longest run with pr < threshold.
    pub fn cdd() -> Self {
        Self::new(
            "cdd",
            "Maximum number of consecutive days with precipitation below the threshold",
            Condition::Below,
            1.0,
        )
    }

    /// Consecutive wet days: longest run with pr >= threshold.
    pub fn cwd() -> Self {
        Self::new(
            "cwd",
            "Maximum number of consecutive days with precipitation at or above the threshold",
            Condition::AtLeast,
            1.0,
        )
    }
}

impl ClimateIndex for SpellIndex {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn units(&self) -> &str {
        "days"
    }

    fn parameters(&self) -> &[ParamSpec] {
        &self.params
    }

    fn compute(
        &self,
        view: SeriesView<'_>,
        mask: &RegionMask,
        spec: &IndexSpec,
    ) -> ClimateResult<IndexResult> {
        let threshold = spec.param_or(&self.params[0]);
        evaluate(
            view,
            mask,
            spec,
            Statistic::LongestRun(self.condition),
            threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::{Aggregation, Grid, Period};
    use test_utils::{point_grid, regular_grid, series_from_fn, single_wet_day_series, uniform_series};

    fn annual(name: &str) -> IndexSpec {
        IndexSpec::new(name, Aggregation::Annual)
    }

    fn compute(index: &SpellIndex, grid: &Grid, series: &climate_common::DailySeries, spec: &IndexSpec) -> IndexResult {
        let view = SeriesView::new(grid, series).unwrap();
        index.compute(view, &RegionMask::full(grid), spec).unwrap()
    }

    #[test]
    fn test_uniformly_wet_year() {
        let grid = regular_grid(0.0, 1.0, 0.0, 1.0, 1.0, 2001, 2);
        let series = uniform_series(&grid, 5.0);
        let cdd = compute(&SpellIndex::cdd(), &grid, &series, &annual("cdd"));
        let cwd = compute(&SpellIndex::cwd(), &grid, &series, &annual("cwd"));
        assert_eq!(cdd.periods, vec![Period::Year(2001), Period::Year(2002)]);
        assert!(cdd.values.iter().all(|&v| v == 0.0));
        assert!(cwd.values.iter().all(|&v| v == 365.0));
    }

    #[test]
    fn test_uniformly_dry_year() {
        let grid = regular_grid(0.0, 1.0, 0.0, 1.0, 1.0, 2004, 1);
        let series = uniform_series(&grid, 0.2);
        let cdd = compute(&SpellIndex::cdd(), &grid, &series, &annual("cdd"));
        let cwd = compute(&SpellIndex::cwd(), &grid, &series, &annual("cwd"));
        // 2004 is a leap year
        assert!(cdd.values.iter().all(|&v| v == 366.0));
        assert!(cwd.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_isolated_wet_day() {
        let grid = point_grid(-30.0, 20.0, 2001, 365);
        let series = single_wet_day_series(&grid, 100, 5.0);
        let cdd = compute(&SpellIndex::cdd(), &grid, &series, &annual("cdd"));
        assert_eq!(cdd.values, vec![264.0]);
        let cwd = compute(&SpellIndex::cwd(), &grid, &series, &annual("cwd"));
        assert_eq!(cwd.values, vec![1.0]);
    }

    #[test]
    fn test_run_resets_at_year_boundary() {
        // Dry from 1 Dec 2001 to 31 Jan 2002, wet otherwise
        let grid = point_grid(0.0, 0.0, 2001, 730);
        let series = series_from_fn(&grid, |t, _, _| if (334..396).contains(&t) { 0.0 } else { 8.0 });
        let cdd = compute(&SpellIndex::cdd(), &grid, &series, &annual("cdd"));
        assert_eq!(cdd.values, vec![31.0, 31.0]);
    }

    #[test]
    fn test_threshold_parameter_used() {
        let grid = point_grid(0.0, 0.0, 2001, 365);
        let series = uniform_series(&grid, 3.0);
        let spec = annual("cdd").with_param(THRESHOLD_MM, 5.0);
        let cdd = compute(&SpellIndex::cdd(), &grid, &series, &spec);
        assert_eq!(cdd.values, vec![365.0]);
    }

    #[test]
    fn test_monthly_periods() {
        let grid = point_grid(0.0, 0.0, 2001, 59);
        let series = uniform_series(&grid, 0.0);
        let spec = IndexSpec::new("cdd", Aggregation::Monthly);
        let cdd = compute(&SpellIndex::cdd(), &grid, &series, &spec);
        assert_eq!(cdd.values, vec![31.0, 28.0]);
    }

    #[test]
    fn test_outside_mask_is_nan() {
        let grid = regular_grid(0.0, 0.0, 0.0, 1.0, 1.0, 2001, 1);
        let series = uniform_series(&grid, 0.0);
        let view = SeriesView::new(&grid, &series).unwrap();
        let mask = RegionMask::from_cells(1, 2, vec![true, false]).unwrap();
        let cdd = SpellIndex::cdd().compute(view, &mask, &annual("cdd")).unwrap();
        assert_eq!(cdd.values[0], 365.0);
        assert!(cdd.values[1].is_nan());
    }
}
