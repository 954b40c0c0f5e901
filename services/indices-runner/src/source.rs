//! NetCDF-backed grid source over the downloader's directory layout:
//! `<data_dir>/<variable>/<MODEL>/<experiment>/*.nc`, typically one file per
//! year.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Datelike;
use climate_common::{ClimateError, ClimateResult, TimeRange};
use climate_indices::{GridData, GridSource};
use netcdf_parser::{read_daily_field, DailyField};
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct NetCdfSource {
    data_dir: PathBuf,
}

impl NetCdfSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn unit_dir(&self, variable: &str, model: &str, experiment: &str) -> PathBuf {
        self.data_dir.join(variable).join(model).join(experiment)
    }

    /// `.nc` files of one unit in name order, skipping files whose name
    /// ends in a year outside `range`.
    pub fn files(
        &self,
        variable: &str,
        model: &str,
        experiment: &str,
        range: Option<TimeRange>,
    ) -> Vec<PathBuf> {
        let dir = self.unit_dir(variable, model, experiment);
        WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "nc"))
            .filter(|p| match (range, file_year(p)) {
                (Some(r), Some(year)) => year >= r.start.year() && year <= r.end.year(),
                _ => true,
            })
            .collect()
    }
}

/// Trailing `_YYYY` of a file stem, as written by the downloader.
fn file_year(path: &Path) -> Option<i32> {
    let stem = path.file_stem()?.to_str()?;
    let (_, tail) = stem.rsplit_once('_')?;
    if tail.len() == 4 {
        tail.parse().ok()
    } else {
        None
    }
}

impl GridSource for NetCdfSource {
    fn models(&self, variable: &str, experiment: &str) -> ClimateResult<Vec<String>> {
        let root = self.data_dir.join(variable);
        if !root.is_dir() {
            return Err(ClimateError::data_unavailable(
                "*",
                experiment,
                format!("no {} directory under {}", variable, self.data_dir.display()),
            ));
        }

        let models = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir() && e.path().join(experiment).is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        Ok(models)
    }

    fn load(
        &self,
        model: &str,
        experiment: &str,
        variable: &str,
        range: Option<TimeRange>,
    ) -> ClimateResult<Arc<GridData>> {
        let unavailable = |reason: String| ClimateError::data_unavailable(model, experiment, reason);

        let files = self.files(variable, model, experiment, range);
        if files.is_empty() {
            return Err(unavailable(format!(
                "no {} files in {}",
                variable,
                self.unit_dir(variable, model, experiment).display()
            )));
        }

        let mut parts = Vec::with_capacity(files.len());
        for file in &files {
            debug!(path = %file.display(), variable = variable, "Reading NetCDF file");
            let field = read_daily_field(file, variable)
                .map_err(|e| unavailable(format!("{}: {}", file.display(), e)))?;
            parts.push(field);
        }

        let mut field = DailyField::concat(parts).map_err(|e| unavailable(e.to_string()))?;
        if variable == "pr" {
            field
                .convert_precipitation()
                .map_err(|e| unavailable(e.to_string()))?;
        }
        let (grid, series) = field.into_grid().map_err(|e| unavailable(e.to_string()))?;
        let data = GridData::new(grid, series)?;
        let data = match range {
            Some(range) => data.clipped(range)?,
            None => data,
        };
        if data.grid.nt() == 0 {
            return Err(unavailable("no days in the requested range".to_string()));
        }

        info!(
            model = model,
            experiment = experiment,
            variable = variable,
            files = files.len(),
            days = data.grid.nt(),
            ny = data.grid.ny(),
            nx = data.grid.nx(),
            "Loaded model grid"
        );
        Ok(Arc::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_models_require_experiment_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("pr/MIROC6/historical/pr_1950.nc"));
        touch(&dir.path().join("pr/CanESM5/historical/pr_1950.nc"));
        touch(&dir.path().join("pr/ACCESS-CM2/ssp245/pr_2015.nc"));

        let source = NetCdfSource::new(dir.path());
        assert_eq!(
            source.models("pr", "historical").unwrap(),
            vec!["CanESM5", "MIROC6"]
        );
        assert!(source.models("tasmax", "historical").is_err());
    }

    #[test]
    fn test_files_filtered_by_year() {
        let dir = tempfile::tempdir().unwrap();
        for year in [1949, 1950, 1951, 2014] {
            touch(&dir.path().join(format!("pr/M/historical/pr_day_M_historical_{}.nc", year)));
        }
        touch(&dir.path().join("pr/M/historical/README.txt"));
        touch(&dir.path().join("pr/M/historical/pr_merged.nc"));

        let source = NetCdfSource::new(dir.path());
        let range = TimeRange::years(1950, 1951).unwrap();
        let names: Vec<String> = source
            .files("pr", "M", "historical", Some(range))
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "pr_day_M_historical_1950.nc",
                "pr_day_M_historical_1951.nc",
                "pr_merged.nc"
            ]
        );
        assert_eq!(source.files("pr", "M", "historical", None).len(), 5);
    }

    #[test]
    fn test_missing_unit_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = NetCdfSource::new(dir.path());
        let err = source.load("M", "historical", "pr", None).unwrap_err();
        assert!(matches!(err, ClimateError::DataUnavailable { .. }));
    }

    #[test]
    fn test_unreadable_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("pr/M/historical/pr_1950.nc"));
        let source = NetCdfSource::new(dir.path());
        let err = source.load("M", "historical", "pr", None).unwrap_err();
        assert!(matches!(err, ClimateError::DataUnavailable { .. }));
        assert!(err.to_string().contains("pr_1950.nc"));
    }
}
