//! Multi-model ensemble reduction of biome values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use climate_common::{ClimateError, Period};
use serde::{Deserialize, Serialize};

use crate::aggregate::BiomeSummary;

/// Which standard deviation to report as ensemble spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spread {
    /// Divide by n (ddof = 0).
    #[default]
    Population,
    /// Divide by n - 1 (ddof = 1); undefined for a single model.
    Sample,
}

impl Spread {
    fn ddof(self) -> usize {
        match self {
            Spread::Population => 0,
            Spread::Sample => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Spread::Population => "population",
            Spread::Sample => "sample",
        }
    }
}

impl FromStr for Spread {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "population" => Ok(Spread::Population),
            "sample" => Ok(Spread::Sample),
            other => Err(ClimateError::config_invalid(format!(
                "unknown spread '{}' (expected population or sample)",
                other
            ))),
        }
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ensemble statistics for one (experiment, index, biome, period).
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleStat {
    pub experiment: String,
    pub index: String,
    pub biome: String,
    pub period: Period,
    pub mean: f64,
    pub spread: f64,
    pub model_count: usize,
    /// Contributing models, sorted.
    pub models: Vec<String>,
}

type EnsembleKey = (String, String, String, Period);

/// Reduces biome values across models.
///
/// Only models with a finite value for a given key contribute to it; a model
/// missing one biome or period still counts everywhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleAggregator {
    spread: Spread,
}

impl EnsembleAggregator {
    pub fn new(spread: Spread) -> Self {
        Self { spread }
    }

    pub fn spread(&self) -> Spread {
        self.spread
    }

    /// Reduce every key present in `summaries`.
    ///
    /// Keys where no model produced a value are kept with NaN statistics and
    /// a model count of zero. Output is sorted by key and does not depend on
    /// the order of `summaries`.
    pub fn reduce(&self, summaries: &[BiomeSummary]) -> Vec<EnsembleStat> {
        let mut groups: BTreeMap<EnsembleKey, Vec<(&str, f64)>> = BTreeMap::new();

        for summary in summaries {
            for value in &summary.values {
                let key = (
                    summary.experiment.clone(),
                    summary.index.clone(),
                    value.biome.clone(),
                    value.period,
                );
                let members = groups.entry(key).or_default();
                if value.value.is_finite() {
                    members.push((summary.model.as_str(), value.value));
                }
            }
        }

        groups
            .into_iter()
            .map(|((experiment, index, biome, period), mut members)| {
                members.sort_by(|a, b| a.0.cmp(b.0));
                let values: Vec<f64> = members.iter().map(|&(_, v)| v).collect();
                let (mean, spread) = self.mean_and_spread(&values);
                EnsembleStat {
                    experiment,
                    index,
                    biome,
                    period,
                    mean,
                    spread,
                    model_count: values.len(),
                    models: members.iter().map(|&(m, _)| m.to_string()).collect(),
                }
            })
            .collect()
    }

    /// Mean and standard deviation; NaN where undefined.
    pub fn mean_and_spread(&self, values: &[f64]) -> (f64, f64) {
        let n = values.len();
        if n == 0 {
            return (f64::NAN, f64::NAN);
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let ddof = self.spread.ddof();
        if n <= ddof {
            return (mean, f64::NAN);
        }
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (mean, (ss / (n - ddof) as f64).sqrt())
    }
}
