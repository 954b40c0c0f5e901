//! Biome aggregation: per-cell index values to one value per biome and period.

use climate_common::{Aggregation, ClimateError, ClimateResult, Period};
use tracing::debug;

use crate::index::IndexResult;
use crate::mask::RegionMask;

/// One biome's value for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeValue {
    pub biome: String,
    pub period: Period,
    /// Mean over valid masked cells; NaN when the period was rejected.
    pub value: f64,
    pub valid_cells: usize,
    pub total_cells: usize,
    /// Why `value` is NaN, if it is.
    pub issue: Option<String>,
}

/// Biome values of one index for one model and experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeSummary {
    pub model: String,
    pub experiment: String,
    pub index: String,
    pub aggregation: Aggregation,
    pub values: Vec<BiomeValue>,
}

impl BiomeSummary {
    /// Values that were actually computed (finite).
    pub fn valid_values(&self) -> impl Iterator<Item = &BiomeValue> {
        self.values.iter().filter(|v| v.value.is_finite())
    }
}

/// Arithmetic mean over masked, non-missing cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiomeAggregator {
    max_missing_fraction: Option<f64>,
}

impl BiomeAggregator {
    /// `max_missing_fraction`: largest tolerated share of masked cells with
    /// no value. `None` tolerates any number of missing cells as long as at
    /// least one is valid.
    pub fn new(max_missing_fraction: Option<f64>) -> ClimateResult<Self> {
        if let Some(f) = max_missing_fraction {
            if !(0.0..=1.0).contains(&f) {
                return Err(ClimateError::config_invalid(format!(
                    "max_missing_fraction must lie in [0, 1], got {}",
                    f
                )));
            }
        }
        Ok(Self {
            max_missing_fraction,
        })
    }

    pub fn max_missing_fraction(&self) -> Option<f64> {
        self.max_missing_fraction
    }

    /// Reduce period `p` of `result` over `mask`.
    ///
    /// Fails with `InsufficientData` when every masked cell is missing or
    /// the missing fraction exceeds the tolerance.
    pub fn reduce_period(
        &self,
        result: &IndexResult,
        mask: &RegionMask,
        biome: &str,
        p: usize,
    ) -> ClimateResult<BiomeValue> {
        check_shape(result, mask)?;
        let period = result.periods.get(p).copied().ok_or_else(|| {
            ClimateError::InvalidGrid(format!("period {} out of range for {}", p, result.index))
        })?;

        let values = result.period_values(p);
        let mut sum = 0.0f64;
        let mut valid = 0usize;
        for &cell in mask.selected() {
            let v = values[cell];
            if v.is_finite() {
                sum += v as f64;
                valid += 1;
            }
        }

        let total = mask.count();
        let insufficient = || ClimateError::InsufficientData {
            biome: biome.to_string(),
            period: period.label(),
            valid,
            total,
        };

        if valid == 0 {
            return Err(insufficient());
        }
        if let Some(limit) = self.max_missing_fraction {
            let missing = (total - valid) as f64 / total as f64;
            if missing > limit {
                return Err(insufficient());
            }
        }

        Ok(BiomeValue {
            biome: biome.to_string(),
            period,
            value: sum / valid as f64,
            valid_cells: valid,
            total_cells: total,
            issue: None,
        })
    }

    /// Reduce every period. `InsufficientData` becomes a NaN value with the
    /// cause recorded; other errors propagate.
    pub fn summarize(
        &self,
        result: &IndexResult,
        mask: &RegionMask,
        biome: &str,
    ) -> ClimateResult<Vec<BiomeValue>> {
        check_shape(result, mask)?;
        (0..result.n_periods())
            .map(|p| match self.reduce_period(result, mask, biome, p) {
                Ok(value) => Ok(value),
                Err(err @ ClimateError::InsufficientData { .. }) => {
                    debug!(biome = biome, index = %result.index, period = %result.periods[p], error = %err, "Biome value rejected");
                    let valid_cells = match &err {
                        ClimateError::InsufficientData { valid, .. } => *valid,
                        _ => 0,
                    };
                    Ok(BiomeValue {
                        biome: biome.to_string(),
                        period: result.periods[p],
                        value: f64::NAN,
                        valid_cells,
                        total_cells: mask.count(),
                        issue: Some(err.to_string()),
                    })
                }
                Err(err) => Err(err),
            })
            .collect()
    }
}

fn check_shape(result: &IndexResult, mask: &RegionMask) -> ClimateResult<()> {
    if result.shape != mask.shape() {
        return Err(ClimateError::ShapeMismatch {
            expected: result.shape,
            actual: mask.shape(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(values: Vec<f32>) -> IndexResult {
        let n = values.len() / 4;
        IndexResult {
            index: "cdd".to_string(),
            aggregation: Aggregation::Annual,
            periods: (0..n as i32).map(|i| Period::Year(2000 + i)).collect(),
            shape: (2, 2),
            values,
        }
    }

    fn mask(cells: [bool; 4]) -> RegionMask {
        RegionMask::from_cells(2, 2, cells.to_vec()).unwrap()
    }

    #[test]
    fn test_mean_over_masked_cells() {
        let r = result(vec![10.0, 20.0, 30.0, 1000.0]);
        let m = mask([true, true, true, false]);
        let v = BiomeAggregator::default().reduce_period(&r, &m, "Fynbos", 0).unwrap();
        assert_eq!(v.value, 20.0);
        assert_eq!((v.valid_cells, v.total_cells), (3, 3));
    }

    #[test]
    fn test_missing_cells_skipped_by_default() {
        let r = result(vec![10.0, f32::NAN, 30.0, 0.0]);
        let m = mask([true, true, true, false]);
        let v = BiomeAggregator::default().reduce_period(&r, &m, "Fynbos", 0).unwrap();
        assert_eq!(v.value, 20.0);
        assert_eq!(v.valid_cells, 2);
    }

    #[test]
    fn test_all_missing_is_insufficient() {
        let r = result(vec![f32::NAN, f32::NAN, 5.0, 5.0]);
        let m = mask([true, true, false, false]);
        let err = BiomeAggregator::default().reduce_period(&r, &m, "Karoo", 0).unwrap_err();
        assert!(matches!(
            err,
            ClimateError::InsufficientData { valid: 0, total: 2, .. }
        ));
    }

    #[test]
    fn test_tolerance_exceeded() {
        let r = result(vec![10.0, f32::NAN, f32::NAN, 4.0]);
        let m = mask([true; 4]);
        let strict = BiomeAggregator::new(Some(0.25)).unwrap();
        assert!(strict.reduce_period(&r, &m, "Savanna", 0).is_err());
        let loose = BiomeAggregator::new(Some(0.5)).unwrap();
        assert_eq!(loose.reduce_period(&r, &m, "Savanna", 0).unwrap().value, 7.0);
    }

    #[test]
    fn test_summarize_flags_rejected_periods() {
        let r = result(vec![1.0, 3.0, 0.0, 0.0, f32::NAN, f32::NAN, 0.0, 0.0]);
        let m = mask([true, true, false, false]);
        let values = BiomeAggregator::default().summarize(&r, &m, "Grassland").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value, 2.0);
        assert!(values[0].issue.is_none());
        assert!(values[1].value.is_nan());
        assert!(values[1].issue.as_deref().unwrap().contains("Grassland"));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        assert!(BiomeAggregator::new(Some(1.5)).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let r = result(vec![1.0; 4]);
        let m = RegionMask::from_cells(1, 4, vec![true; 4]).unwrap();
        assert!(matches!(
            BiomeAggregator::default().summarize(&r, &m, "x"),
            Err(ClimateError::ShapeMismatch { .. })
        ));
    }
}
