//! Declarative run configuration and its one-shot validation.
//!
//! Index parameter blocks sit at the top level next to the other sections,
//! keyed by index name:
//!
//! ```yaml
//! run_indices: [cdd, r10mm]
//! cdd:   { threshold_mm: 1.0, aggregation: annual }
//! r10mm: { aggregation: monthly }
//! experiments: { select: [historical] }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use climate_common::{Aggregation, BoundingBox, ClimateError, ClimateResult, TimeRange};
use serde::{Deserialize, Serialize};

use crate::aggregate::BiomeAggregator;
use crate::biome::DEFAULT_NAME_PROPERTY;
use crate::ensemble::{EnsembleAggregator, Spread};
use crate::index::{IndexRegistry, ResolvedIndex};

/// Run configuration as written in YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Clipping box applied to every model grid.
    #[serde(default)]
    pub region: Option<BoundingBox>,

    /// Indices to compute, by registry name.
    #[serde(default)]
    pub run_indices: Vec<String>,

    #[serde(default)]
    pub experiments: ExperimentConfig,

    #[serde(default)]
    pub models: ModelConfig,

    /// Default year range for every experiment.
    #[serde(default)]
    pub time: Option<YearRange>,

    #[serde(default)]
    pub biomes: Option<BiomeConfig>,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub ensemble: EnsembleConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Per-index parameter blocks (`cdd: { threshold_mm: 1.0 }`).
    #[serde(flatten)]
    pub index_params: BTreeMap<String, IndexParams>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub select: Vec<String>,
    /// Year ranges overriding `time` for individual experiments.
    #[serde(default)]
    pub time_ranges: BTreeMap<String, YearRange>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Empty selects every model the source offers.
    #[serde(default)]
    pub select: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl YearRange {
    pub fn to_range(self) -> ClimateResult<TimeRange> {
        if self.start_year > self.end_year {
            return Err(ClimateError::config_invalid(format!(
                "time range {}..{} is inverted",
                self.start_year, self.end_year
            )));
        }
        TimeRange::years(self.start_year, self.end_year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeConfig {
    pub path: PathBuf,
    #[serde(default = "default_name_property")]
    pub name_property: String,
}

fn default_name_property() -> String {
    DEFAULT_NAME_PROPERTY.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Largest tolerated share of missing cells per biome and period.
    #[serde(default)]
    pub max_missing_fraction: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default)]
    pub spread: Spread,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Also produce per-cell ensemble mean maps.
    #[serde(default = "default_true")]
    pub raster: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            raster: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/outputs")
}

fn default_true() -> bool {
    true
}

/// Parameters for one index; every key except `aggregation` is numeric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexParams {
    #[serde(default)]
    pub aggregation: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// One experiment to run and its date window.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPlan {
    pub name: String,
    pub range: Option<TimeRange>,
}

/// Validated configuration, ready for the orchestrator.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub region: Option<BoundingBox>,
    pub indices: Vec<ResolvedIndex>,
    pub experiments: Vec<ExperimentPlan>,
    /// Empty selects every model the source offers.
    pub models: Vec<String>,
    pub biomes: Option<BiomeConfig>,
    pub aggregator: BiomeAggregator,
    pub ensemble: EnsembleAggregator,
    pub output: OutputConfig,
}

impl RunPlan {
    /// Distinct input variables needed by the selected indices, sorted.
    pub fn variables(&self) -> Vec<String> {
        let mut vars: Vec<String> = self
            .indices
            .iter()
            .map(|i| i.index.variable().to_string())
            .collect();
        vars.sort();
        vars.dedup();
        vars
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indices.iter().map(|i| i.name()).collect()
    }
}

impl RunConfig {
    /// Parse YAML text. Syntax and type errors are `ConfigInvalid`.
    pub fn from_yaml_str(text: &str) -> ClimateResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| ClimateError::config_invalid(format!("failed to parse configuration: {}", e)))
    }

    /// Check everything that can be checked without touching data.
    pub fn validate(&self, registry: &IndexRegistry) -> ClimateResult<RunPlan> {
        if self.run_indices.is_empty() {
            return Err(ClimateError::config_invalid("run_indices is empty"));
        }

        if let Some(name) = self
            .index_params
            .keys()
            .find(|name| !registry.contains(name))
        {
            return Err(ClimateError::config_invalid(format!(
                "parameters given for unknown index '{}'",
                name
            )));
        }

        let mut indices: Vec<ResolvedIndex> = Vec::with_capacity(self.run_indices.len());
        for name in &self.run_indices {
            let params = self.params_for(name);
            let aggregation = params
                .and_then(|p| p.aggregation.as_deref())
                .map(|a| a.parse::<Aggregation>())
                .transpose()?;
            let empty = BTreeMap::new();
            let values = params.map(|p| &p.values).unwrap_or(&empty);
            let resolved = registry.resolve(name, aggregation, values)?;
            if indices.iter().any(|i| i.name() == resolved.name()) {
                return Err(ClimateError::config_invalid(format!(
                    "index '{}' listed twice",
                    resolved.name()
                )));
            }
            indices.push(resolved);
        }

        if let Some(bbox) = &self.region {
            bbox.validate()
                .map_err(|e| ClimateError::config_invalid(format!("region: {}", e)))?;
        }

        if self.experiments.select.is_empty() {
            return Err(ClimateError::config_invalid("experiments.select is empty"));
        }

        let default_range = self.time.map(YearRange::to_range).transpose()?;
        let mut experiments = Vec::with_capacity(self.experiments.select.len());
        for name in &self.experiments.select {
            let range = match self.experiments.time_ranges.get(name) {
                Some(years) => Some(years.to_range()?),
                None => default_range,
            };
            experiments.push(ExperimentPlan {
                name: name.clone(),
                range,
            });
        }

        let aggregator = BiomeAggregator::new(self.aggregation.max_missing_fraction)?;

        let mut models = self.models.select.clone();
        models.sort();
        models.dedup();

        Ok(RunPlan {
            region: self.region,
            indices,
            experiments,
            models,
            biomes: self.biomes.clone(),
            aggregator,
            ensemble: EnsembleAggregator::new(self.ensemble.spread),
            output: self.output.clone(),
        })
    }

    fn params_for(&self, name: &str) -> Option<&IndexParams> {
        let key = name.trim().to_lowercase();
        self.index_params
            .iter()
            .find(|(k, _)| k.trim().to_lowercase() == key)
            .map(|(_, p)| p)
    }
}
