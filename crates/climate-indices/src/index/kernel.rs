//! Per-period threshold statistics over masked cells.
//!
//! One pass over the days of each period, updating a small state vector per
//! masked cell: O(time_steps × masked_cells). Periods are independent and are
//! evaluated in parallel; each writes only its own slice of the output.

use std::ops::Range;

use climate_common::{ClimateError, ClimateResult, DailySeries, SeriesView};
use rayon::prelude::*;

use super::{IndexResult, IndexSpec};
use crate::mask::RegionMask;

/// Daily test against a threshold in mm/day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// pr < threshold (dry day)
    Below,
    /// pr >= threshold (wet day)
    AtLeast,
}

impl Condition {
    pub fn test(self, value: f32, threshold: f64) -> bool {
        let value = value as f64;
        match self {
            Condition::Below => value < threshold,
            Condition::AtLeast => value >= threshold,
        }
    }
}

/// What to accumulate over the days of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// Length of the longest run of consecutive days meeting the condition.
    LongestRun(Condition),
    /// Number of days meeting the condition.
    Count(Condition),
}

impl Statistic {
    fn condition(self) -> Condition {
        match self {
            Statistic::LongestRun(c) | Statistic::Count(c) => c,
        }
    }
}

/// Evaluate a statistic for every period of `spec.aggregation`.
pub fn evaluate(
    view: SeriesView<'_>,
    mask: &RegionMask,
    spec: &IndexSpec,
    statistic: Statistic,
    threshold: f64,
) -> ClimateResult<IndexResult> {
    mask.check_grid(view.grid)?;
    if mask.is_empty() {
        return Err(ClimateError::empty_mask(format!("{} input", spec.name)));
    }

    let periods = view.periods(spec.aggregation);
    let n_cells = view.grid.n_cells();
    let mut values = vec![f32::NAN; periods.len() * n_cells];
    let cells = mask.selected();

    values
        .par_chunks_mut(n_cells)
        .zip(periods.ranges().par_iter())
        .for_each(|(out, days)| {
            evaluate_period(view.series, cells, days.clone(), statistic, threshold, out);
        });

    Ok(IndexResult {
        index: spec.name.clone(),
        aggregation: spec.aggregation,
        periods: periods.periods().to_vec(),
        shape: view.grid.shape(),
        values,
    })
}

fn evaluate_period(
    series: &DailySeries,
    cells: &[usize],
    days: Range<usize>,
    statistic: Statistic,
    threshold: f64,
    out: &mut [f32],
) {
    // Empty period: leave NaN
    if days.is_empty() {
        return;
    }

    let condition = statistic.condition();
    let runs = matches!(statistic, Statistic::LongestRun(_));
    let m = cells.len();
    let mut current = vec![0u32; m];
    let mut best = vec![0u32; m];
    let mut valid = vec![0u32; m];

    for t in days {
        let day = series.day(t);
        for (k, &cell) in cells.iter().enumerate() {
            let value = day[cell];
            if value.is_nan() {
                // Missing days break a run; they are never assumed dry.
                current[k] = 0;
                continue;
            }
            valid[k] += 1;
            let hit = condition.test(value, threshold);
            if runs {
                if hit {
                    current[k] += 1;
                    best[k] = best[k].max(current[k]);
                } else {
                    current[k] = 0;
                }
            } else if hit {
                best[k] += 1;
            }
        }
    }

    for (k, &cell) in cells.iter().enumerate() {
        out[cell] = if valid[k] == 0 { f32::NAN } else { best[k] as f32 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::Aggregation;
    use test_utils::{point_grid, series_from_fn};

    fn run(values: &[f32], statistic: Statistic, threshold: f64) -> f32 {
        let grid = point_grid(0.0, 0.0, 2001, values.len());
        let series = series_from_fn(&grid, |t, _, _| values[t]);
        let view = SeriesView::new(&grid, &series).unwrap();
        let mask = RegionMask::full(&grid);
        let spec = IndexSpec::new("test", Aggregation::Annual);
        let result = evaluate(view, &mask, &spec, statistic, threshold).unwrap();
        result.values[0]
    }

    #[test]
    fn test_longest_run() {
        let v = [0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 2.0];
        assert_eq!(run(&v, Statistic::LongestRun(Condition::Below), 1.0), 3.0);
        assert_eq!(run(&v, Statistic::LongestRun(Condition::AtLeast), 1.0), 1.0);
    }

    #[test]
    fn test_threshold_is_inclusive_for_wet_days() {
        let v = [1.0, 1.0, 0.999];
        assert_eq!(run(&v, Statistic::LongestRun(Condition::AtLeast), 1.0), 2.0);
        assert_eq!(run(&v, Statistic::LongestRun(Condition::Below), 1.0), 1.0);
    }

    #[test]
    fn test_nan_breaks_run() {
        let v = [0.0, 0.0, f32::NAN, 0.0, 0.0, 0.0];
        assert_eq!(run(&v, Statistic::LongestRun(Condition::Below), 1.0), 3.0);
    }

    #[test]
    fn test_all_missing_is_nan() {
        let v = [f32::NAN; 4];
        assert!(run(&v, Statistic::Count(Condition::AtLeast), 10.0).is_nan());
    }

    #[test]
    fn test_count() {
        let v = [10.0, 9.9, 25.0, 0.0, 10.0];
        assert_eq!(run(&v, Statistic::Count(Condition::AtLeast), 10.0), 3.0);
    }

    #[test]
    fn test_empty_mask_rejected_before_compute() {
        let grid = point_grid(0.0, 0.0, 2001, 3);
        let series = series_from_fn(&grid, |_, _, _| 0.0);
        let view = SeriesView::new(&grid, &series).unwrap();
        let mask = RegionMask::from_cells(1, 1, vec![false]).unwrap();
        let spec = IndexSpec::new("cdd", Aggregation::Annual);
        let err = evaluate(view, &mask, &spec, Statistic::Count(Condition::Below), 1.0).unwrap_err();
        assert!(matches!(err, ClimateError::EmptyMask { .. }));
    }
}
