//! Climate index contract, built-in indices and the registry.
//!
//! An index is a pure function of a daily series, a region mask and an
//! [`IndexSpec`]. It produces one value per aggregation period per grid
//! cell. Built-ins:
//!
//! | name    | statistic                                         | default threshold |
//! |---------|---------------------------------------------------|-------------------|
//! | `cdd`   | longest run of days with pr < threshold           | 1 mm/day          |
//! | `cwd`   | longest run of days with pr >= threshold          | 1 mm/day          |
//! | `r10mm` | count of days with pr >= threshold                | 10 mm/day         |
//! | `r20mm` | count of days with pr >= threshold                | 20 mm/day         |
//!
//! Runs reset at every period boundary and missing (NaN) days break a run.

mod count;
mod kernel;
mod registry;
mod spell;

use std::collections::BTreeMap;

use climate_common::{Aggregation, ClimateResult, Period, SeriesView};

use crate::mask::RegionMask;

pub use count::CountIndex;
pub use kernel::{evaluate, Condition, Statistic};
pub use registry::{BuiltinIndex, IndexRegistry, ResolvedIndex};
pub use spell::SpellIndex;

/// Parameter key shared by every built-in index.
pub const THRESHOLD_MM: &str = "threshold_mm";

/// A tunable parameter an index accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    pub description: &'static str,
}

/// Computation contract every index implements.
///
/// Implementations hold no mutable state, so one instance can be shared by
/// every model worker.
pub trait ClimateIndex: Send + Sync {
    /// Identifier used in configuration, e.g. `cdd`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Input variable the index is computed from.
    fn variable(&self) -> &str {
        "pr"
    }

    /// Units of the produced values.
    fn units(&self) -> &str;

    /// Accepted parameters with their defaults.
    fn parameters(&self) -> &[ParamSpec];

    /// Compute per-period, per-cell values over the masked cells.
    fn compute(
        &self,
        view: SeriesView<'_>,
        mask: &RegionMask,
        spec: &IndexSpec,
    ) -> ClimateResult<IndexResult>;
}

/// A configured index: name, aggregation and resolved parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: String,
    pub aggregation: Aggregation,
    pub params: BTreeMap<String, f64>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, aggregation: Aggregation) -> Self {
        Self {
            name: name.into(),
            aggregation,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn param(&self, key: &str) -> Option<f64> {
        self.params.get(key).copied()
    }

    /// Parameter value, falling back to the declared default.
    pub fn param_or(&self, spec: &ParamSpec) -> f64 {
        self.param(spec.name).unwrap_or(spec.default)
    }
}

/// Per-period, per-cell values of one index for one model and experiment.
///
/// `values` is period-major: period `p` occupies
/// `values[p * n_cells..(p + 1) * n_cells]`, cells row-major over (lat, lon).
/// Cells outside the mask, cells with no valid day in a period, and periods
/// with no days at all hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexResult {
    pub index: String,
    pub aggregation: Aggregation,
    pub periods: Vec<Period>,
    pub shape: (usize, usize),
    pub values: Vec<f32>,
}

impl IndexResult {
    pub fn n_cells(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    pub fn n_periods(&self) -> usize {
        self.periods.len()
    }

    /// All cells for period number `p`.
    pub fn period_values(&self, p: usize) -> &[f32] {
        let n = self.n_cells();
        &self.values[p * n..(p + 1) * n]
    }

    pub fn value(&self, p: usize, y: usize, x: usize) -> Option<f32> {
        if p >= self.n_periods() || y >= self.shape.0 || x >= self.shape.1 {
            return None;
        }
        Some(self.period_values(p)[y * self.shape.1 + x])
    }

    /// Bitwise equality, treating NaNs with the same bits as equal.
    pub fn bit_identical(&self, other: &IndexResult) -> bool {
        self.index == other.index
            && self.aggregation == other.aggregation
            && self.periods == other.periods
            && self.shape == other.shape
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}
