//! Climatology rasters: per-cell long-term means and their ensemble mean.

use std::collections::BTreeMap;

use climate_common::{Grid, GridKey};

use crate::index::IndexResult;

/// Per-cell mean of one index over all periods, for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct CellClimatology {
    pub model: String,
    pub experiment: String,
    pub index: String,
    pub grid: GridKey,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    /// Row-major over (lat, lon); NaN where no period had a value.
    pub values: Vec<f32>,
}

impl CellClimatology {
    pub fn from_result(
        model: impl Into<String>,
        experiment: impl Into<String>,
        result: &IndexResult,
        grid: &Grid,
    ) -> Self {
        let n = result.n_cells();
        let mut sums = vec![0.0f64; n];
        let mut counts = vec![0u32; n];
        for p in 0..result.n_periods() {
            for (cell, &v) in result.period_values(p).iter().enumerate() {
                if v.is_finite() {
                    sums[cell] += v as f64;
                    counts[cell] += 1;
                }
            }
        }
        let values = sums
            .iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { f32::NAN } else { (s / c as f64) as f32 })
            .collect();

        Self {
            model: model.into(),
            experiment: experiment.into(),
            index: result.index.clone(),
            grid: grid.key(),
            lats: grid.lats().to_vec(),
            lons: grid.lons().to_vec(),
            values,
        }
    }
}

/// Ensemble mean climatology for one (experiment, index).
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleRaster {
    pub experiment: String,
    pub index: String,
    pub grid: GridKey,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub values: Vec<f32>,
    /// Models averaged into `values`, sorted.
    pub models: Vec<String>,
    /// Models left out because they sit on a different grid.
    pub excluded: Vec<String>,
}

impl EnsembleRaster {
    /// Iterate `(lat, lon, value)` for every cell with a value.
    pub fn cells(&self) -> impl Iterator<Item = (f64, f64, f32)> + '_ {
        let nx = self.lons.len();
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(move |(i, &v)| (self.lats[i / nx], self.lons[i % nx], v))
    }
}

/// Average per-model climatologies cell by cell.
///
/// Models can only be averaged on a shared grid, so each (experiment, index)
/// uses the grid layout most models share (ties go to the smallest key);
/// the rest are listed as excluded.
pub fn ensemble_rasters(items: &[CellClimatology]) -> Vec<EnsembleRaster> {
    let mut groups: BTreeMap<(&str, &str), Vec<&CellClimatology>> = BTreeMap::new();
    for item in items {
        groups
            .entry((item.experiment.as_str(), item.index.as_str()))
            .or_default()
            .push(item);
    }

    groups
        .into_iter()
        .filter_map(|((experiment, index), mut members)| {
            members.sort_by(|a, b| a.model.cmp(&b.model));

            let mut layouts: BTreeMap<GridKey, usize> = BTreeMap::new();
            for m in &members {
                *layouts.entry(m.grid).or_default() += 1;
            }
            let max = layouts.values().copied().max()?;
            let reference = layouts.into_iter().find(|&(_, c)| c == max).map(|(k, _)| k)?;

            let (included, excluded): (Vec<&CellClimatology>, Vec<&CellClimatology>) =
                members.into_iter().partition(|m| m.grid == reference);
            let first = included.first()?;

            let n = first.values.len();
            let mut sums = vec![0.0f64; n];
            let mut counts = vec![0u32; n];
            for m in &included {
                for (cell, &v) in m.values.iter().enumerate() {
                    if v.is_finite() {
                        sums[cell] += v as f64;
                        counts[cell] += 1;
                    }
                }
            }

            Some(EnsembleRaster {
                experiment: experiment.to_string(),
                index: index.to_string(),
                grid: reference,
                lats: first.lats.clone(),
                lons: first.lons.clone(),
                values: sums
                    .iter()
                    .zip(&counts)
                    .map(|(&s, &c)| if c == 0 { f32::NAN } else { (s / c as f64) as f32 })
                    .collect(),
                models: included.iter().map(|m| m.model.clone()).collect(),
                excluded: excluded.iter().map(|m| m.model.clone()).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::{Aggregation, Period};
    use test_utils::regular_grid;

    fn climatology(model: &str, grid: &Grid, per_period: &[[f32; 4]]) -> CellClimatology {
        let result = IndexResult {
            index: "cdd".to_string(),
            aggregation: Aggregation::Annual,
            periods: (0..per_period.len() as i32).map(|i| Period::Year(2000 + i)).collect(),
            shape: grid.shape(),
            values: per_period.iter().flatten().copied().collect(),
        };
        CellClimatology::from_result(model, "historical", &result, grid)
    }

    #[test]
    fn test_cell_mean_skips_nan_periods() {
        let grid = regular_grid(0.0, 1.0, 0.0, 1.0, 1.0, 2000, 1);
        let c = climatology(
            "A",
            &grid,
            &[[10.0, f32::NAN, 1.0, f32::NAN], [20.0, f32::NAN, f32::NAN, f32::NAN]],
        );
        assert_eq!(c.values[0], 15.0);
        assert!(c.values[1].is_nan());
        assert_eq!(c.values[2], 1.0);
    }

    #[test]
    fn test_ensemble_uses_majority_grid() {
        let grid = regular_grid(0.0, 1.0, 0.0, 1.0, 1.0, 2000, 1);
        let shifted = regular_grid(0.5, 1.5, 0.0, 1.0, 1.0, 2000, 1);
        let items = vec![
            climatology("A", &grid, &[[10.0, 10.0, 10.0, 10.0]]),
            climatology("B", &grid, &[[20.0, 20.0, f32::NAN, 20.0]]),
            climatology("C", &shifted, &[[99.0, 99.0, 99.0, 99.0]]),
        ];
        let rasters = ensemble_rasters(&items);
        assert_eq!(rasters.len(), 1);
        let r = &rasters[0];
        assert_eq!(r.models, vec!["A", "B"]);
        assert_eq!(r.excluded, vec!["C"]);
        assert_eq!(r.values, vec![15.0, 15.0, 10.0, 15.0]);
        assert_eq!(r.cells().count(), 4);
    }
}
