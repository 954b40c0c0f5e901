//! Threshold count indices (R10mm, R20mm).

use climate_common::{ClimateResult, SeriesView};

use super::kernel::{evaluate, Condition, Statistic};
use super::{ClimateIndex, IndexResult, IndexSpec, ParamSpec, THRESHOLD_MM};
use crate::mask::RegionMask;

/// Number of days per period with precipitation at or above a threshold.
#[derive(Debug, Clone)]
pub struct CountIndex {
    name: &'static str,
    description: &'static str,
    params: [ParamSpec; 1],
}

impl CountIndex {
    pub fn new(name: &'static str, description: &'static str, default_threshold_mm: f64) -> Self {
        Self {
            name,
            description,
            params: [ParamSpec {
                name: THRESHOLD_MM,
                default: default_threshold_mm,
                description: "daily precipitation threshold in mm/day",
            }],
        }
    }

    /// Heavy precipitation days: pr >= 10 mm.
    pub fn r10mm() -> Self {
        Self::new("r10mm", "Number of days with precipitation of at least 10 mm", 10.0)
    }

    /// Very heavy precipitation days: pr >= 20 mm.
    pub fn r20mm() -> Self {
        Self::new("r20mm", "Number of days with precipitation of at least 20 mm", 20.0)
    }
}

impl ClimateIndex for CountIndex {
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
        evaluate(view, mask, spec, Statistic::Count(Condition::AtLeast), threshold)
    }
}
