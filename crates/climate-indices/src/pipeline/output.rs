//! What a run produces, and the seam to whoever persists it.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use climate_common::{ClimateError, ClimateResult, ErrorScope, Period};
use serde::Serialize;

use crate::aggregate::BiomeSummary;
use crate::cache::CacheStats;
use crate::ensemble::{EnsembleStat, Spread};
use crate::raster::EnsembleRaster;

/// Final state of one (experiment, model) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Succeeded,
    Skipped,
    Cancelled,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Succeeded => "succeeded",
            UnitStatus::Skipped => "skipped",
            UnitStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub experiment: String,
    pub model: String,
    pub status: UnitStatus,
    /// Indices that produced a result.
    pub indices: usize,
    pub elapsed_ms: u64,
}

/// Something left out of the results, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipRecord {
    pub experiment: String,
    pub model: Option<String>,
    pub biome: Option<String>,
    pub index: Option<String>,
    pub period: Option<String>,
    pub scope: ErrorScope,
    pub kind: &'static str,
    pub cause: String,
}

impl SkipRecord {
    pub fn from_error(experiment: &str, model: Option<&str>, err: &ClimateError) -> Self {
        Self {
            experiment: experiment.to_string(),
            model: model.map(str::to_string),
            biome: None,
            index: None,
            period: None,
            scope: err.scope(),
            kind: err.kind(),
            cause: err.to_string(),
        }
    }

    pub fn with_biome(mut self, biome: &str) -> Self {
        self.biome = Some(biome.to_string());
        self
    }

    pub fn with_index(mut self, index: &str) -> Self {
        self.index = Some(index.to_string());
        self
    }

    pub fn with_period(mut self, period: &Period) -> Self {
        self.period = Some(period.label());
        self
    }
}

/// Everything a finished (or cancelled) run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Per model: biome values of each index, keyed (model, experiment, index).
    pub summaries: Vec<BiomeSummary>,
    /// Per (experiment, index, biome, period), sorted by that key.
    pub ensemble: Vec<EnsembleStat>,
    pub rasters: Vec<EnsembleRaster>,
    pub units: Vec<UnitReport>,
    pub skips: Vec<SkipRecord>,
    pub mask_cache: CacheStats,
    pub spread: Spread,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RunOutput {
    pub fn succeeded(&self) -> usize {
        self.count(UnitStatus::Succeeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(UnitStatus::Skipped)
    }

    fn count(&self, status: UnitStatus) -> usize {
        self.units.iter().filter(|u| u.status == status).count()
    }

    /// One model's biome value.
    pub fn value(
        &self,
        model: &str,
        experiment: &str,
        index: &str,
        biome: &str,
        period: Period,
    ) -> Option<f64> {
        self.summaries
            .iter()
            .filter(|s| s.model == model && s.experiment == experiment && s.index == index)
            .flat_map(|s| s.values.iter())
            .find(|v| v.biome == biome && v.period == period)
            .map(|v| v.value)
    }

    pub fn ensemble_stat(
        &self,
        experiment: &str,
        index: &str,
        biome: &str,
        period: Period,
    ) -> Option<&EnsembleStat> {
        self.ensemble.iter().find(|s| {
            s.experiment == experiment && s.index == index && s.biome == biome && s.period == period
        })
    }

    /// Models contributing to at least one ensemble value, per (experiment, index).
    pub fn ensemble_members(&self) -> BTreeMap<(String, String), Vec<String>> {
        let mut members: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
        for stat in &self.ensemble {
            members
                .entry((stat.experiment.clone(), stat.index.clone()))
                .or_default()
                .extend(stat.models.iter().cloned());
        }
        members
            .into_iter()
            .map(|(k, v)| (k, v.into_iter().collect()))
            .collect()
    }
}

/// Persists run output (CSV tables, reports, ...).
pub trait OutputSink {
    fn export(&self, output: &RunOutput) -> ClimateResult<()>;
}
