//! Grid source adapter: where daily model grids come from.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use climate_common::{clip_time, ClimateError, ClimateResult, DailySeries, Grid, TimeRange};

/// A model's daily series together with its grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData {
    pub grid: Grid,
    pub series: DailySeries,
}

impl GridData {
    pub fn new(grid: Grid, series: DailySeries) -> ClimateResult<Self> {
        if !series.matches(&grid) {
            return Err(ClimateError::InvalidGrid(
                "series shape does not match grid".to_string(),
            ));
        }
        Ok(Self { grid, series })
    }

    /// Restrict to the days within `range`.
    pub fn clipped(&self, range: TimeRange) -> ClimateResult<Self> {
        let (grid, series) = clip_time(&self.grid, &self.series, range)?;
        Ok(Self { grid, series })
    }
}

/// Read-only access to per-model daily grids.
///
/// Implementations fail with `DataUnavailable` when a model/experiment has no
/// readable data; the orchestrator skips that unit and carries on.
pub trait GridSource: Send + Sync {
    /// Models offering `variable` for `experiment`, sorted.
    fn models(&self, variable: &str, experiment: &str) -> ClimateResult<Vec<String>>;

    /// Load one variable, optionally restricted to a date range.
    fn load(
        &self,
        model: &str,
        experiment: &str,
        variable: &str,
        range: Option<TimeRange>,
    ) -> ClimateResult<Arc<GridData>>;
}

type SourceKey = (String, String, String);

/// In-memory grid source, for tests and for embedding the engine.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: BTreeMap<SourceKey, Arc<GridData>>,
    failures: BTreeMap<(String, String), String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        model: impl Into<String>,
        experiment: impl Into<String>,
        variable: impl Into<String>,
        data: GridData,
    ) {
        self.entries
            .insert((model.into(), experiment.into(), variable.into()), Arc::new(data));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        model: impl Into<String>,
        experiment: impl Into<String>,
        variable: impl Into<String>,
        data: GridData,
    ) -> Self {
        self.insert(model, experiment, variable, data);
        self
    }

    /// Make every load for (model, experiment) fail with `DataUnavailable`.
    pub fn fail(mut self, model: impl Into<String>, experiment: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failures
            .insert((model.into(), experiment.into()), reason.into());
        self
    }
}

impl GridSource for MemorySource {
    fn models(&self, variable: &str, experiment: &str) -> ClimateResult<Vec<String>> {
        let models: BTreeSet<String> = self
            .entries
            .keys()
            .filter(|(_, e, v)| e == experiment && v == variable)
            .map(|(m, _, _)| m.clone())
            .chain(
                self.failures
                    .keys()
                    .filter(|(_, e)| e == experiment)
                    .map(|(m, _)| m.clone()),
            )
            .collect();
        Ok(models.into_iter().collect())
    }

    fn load(
        &self,
        model: &str,
        experiment: &str,
        variable: &str,
        range: Option<TimeRange>,
    ) -> ClimateResult<Arc<GridData>> {
        if let Some(reason) = self
            .failures
            .get(&(model.to_string(), experiment.to_string()))
        {
            return Err(ClimateError::data_unavailable(model, experiment, reason.clone()));
        }

        let data = self
            .entries
            .get(&(model.to_string(), experiment.to_string(), variable.to_string()))
            .ok_or_else(|| {
                ClimateError::data_unavailable(model, experiment, format!("no {} data", variable))
            })?;

        match range {
            None => Ok(Arc::clone(data)),
            Some(range) => {
                let clipped = data.clipped(range)?;
                if clipped.grid.nt() == 0 {
                    return Err(ClimateError::data_unavailable(
                        model,
                        experiment,
                        format!("no {} days between {} and {}", variable, range.start, range.end),
                    ));
                }
                Ok(Arc::new(clipped))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{regular_grid, uniform_series};

    fn data(years: i32) -> GridData {
        let grid = regular_grid(0.0, 1.0, 0.0, 1.0, 1.0, 2000, years);
        let series = uniform_series(&grid, 1.0);
        GridData::new(grid, series).unwrap()
    }

    #[test]
    fn test_models_listed_per_experiment() {
        let source = MemorySource::new()
            .with("B", "historical", "pr", data(1))
            .with("A", "historical", "pr", data(1))
            .with("A", "ssp245", "pr", data(1))
            .fail("C", "historical", "corrupt file");
        assert_eq!(source.models("pr", "historical").unwrap(), vec!["A", "B", "C"]);
        assert_eq!(source.models("pr", "ssp245").unwrap(), vec!["A"]);
    }

    #[test]
    fn test_missing_and_failing_entries_are_data_unavailable() {
        let source = MemorySource::new()
            .with("A", "historical", "pr", data(1))
            .fail("A", "ssp245", "truncated");
        assert!(matches!(
            source.load("A", "ssp585", "pr", None),
            Err(ClimateError::DataUnavailable { .. })
        ));
        let err = source.load("A", "ssp245", "pr", None).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_load_clips_to_range() {
        let source = MemorySource::new().with("A", "historical", "pr", data(3));
        let range = TimeRange::years(2001, 2001).unwrap();
        let loaded = source.load("A", "historical", "pr", Some(range)).unwrap();
        assert_eq!(loaded.grid.nt(), 365);

        let outside = TimeRange::years(1990, 1991).unwrap();
        assert!(source.load("A", "historical", "pr", Some(outside)).is_err());
    }
}
