//! CSV and JSON export of run output.
//!
//! Files written to the output directory:
//!
//! - `biome_summary.csv`: one row per (model, experiment, index, biome, period)
//! - `ensemble_summary.csv`: one row per (experiment, index, biome, period)
//! - `<index>_ensemble_mean_<experiment>.csv`: per-cell ensemble mean map
//! - `run_report.json`: members, skips, unit statuses, cache statistics

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use climate_common::{ClimateError, ClimateResult};
use climate_indices::{CacheStats, OutputSink, RunOutput, SkipRecord, UnitReport};
use serde::Serialize;
use tracing::info;

pub const BIOME_SUMMARY_FILE: &str = "biome_summary.csv";
pub const ENSEMBLE_SUMMARY_FILE: &str = "ensemble_summary.csv";
pub const RUN_REPORT_FILE: &str = "run_report.json";

/// Writes run output as CSV tables plus a JSON report.
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of an ensemble mean map.
    pub fn raster_file_name(index: &str, experiment: &str) -> String {
        format!("{}_ensemble_mean_{}.csv", index, experiment)
    }

    fn write_biome_summary(&self, output: &RunOutput) -> std::io::Result<usize> {
        let mut w = create(&self.dir.join(BIOME_SUMMARY_FILE))?;
        writeln!(w, "model,experiment,index,aggregation,biome,period,value,valid_cells,total_cells")?;
        let mut rows = 0;
        for summary in &output.summaries {
            for v in &summary.values {
                writeln!(
                    w,
                    "{},{},{},{},{},{},{},{},{}",
                    field(&summary.model),
                    field(&summary.experiment),
                    field(&summary.index),
                    summary.aggregation,
                    field(&v.biome),
                    v.period,
                    number(v.value),
                    v.valid_cells,
                    v.total_cells
                )?;
                rows += 1;
            }
        }
        w.flush()?;
        Ok(rows)
    }

    fn write_ensemble_summary(&self, output: &RunOutput) -> std::io::Result<usize> {
        let mut w = create(&self.dir.join(ENSEMBLE_SUMMARY_FILE))?;
        writeln!(w, "experiment,index,biome,period,mean,spread,model_count,models")?;
        for stat in &output.ensemble {
            writeln!(
                w,
                "{},{},{},{},{},{},{},{}",
                field(&stat.experiment),
                field(&stat.index),
                field(&stat.biome),
                stat.period,
                number(stat.mean),
                number(stat.spread),
                stat.model_count,
                field(&stat.models.join(";"))
            )?;
        }
        w.flush()?;
        Ok(output.ensemble.len())
    }

    fn write_rasters(&self, output: &RunOutput) -> std::io::Result<usize> {
        for raster in &output.rasters {
            let name = Self::raster_file_name(&raster.index, &raster.experiment);
            let mut w = create(&self.dir.join(name))?;
            writeln!(w, "lat,lon,value")?;
            for (lat, lon, value) in raster.cells() {
                writeln!(w, "{},{},{}", lat, lon, value)?;
            }
            w.flush()?;
        }
        Ok(output.rasters.len())
    }

    fn write_report(&self, output: &RunOutput) -> std::io::Result<()> {
        let report = RunReport::from_output(output);
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(self.dir.join(RUN_REPORT_FILE), json)
    }
}

impl OutputSink for CsvExporter {
    fn export(&self, output: &RunOutput) -> ClimateResult<()> {
        let io = |e: std::io::Error| ClimateError::Io(format!("{}: {}", self.dir.display(), e));

        fs::create_dir_all(&self.dir).map_err(io)?;
        let biome_rows = self.write_biome_summary(output).map_err(io)?;
        let ensemble_rows = self.write_ensemble_summary(output).map_err(io)?;
        let rasters = self.write_rasters(output).map_err(io)?;
        self.write_report(output).map_err(io)?;

        info!(
            dir = %self.dir.display(),
            biome_rows = biome_rows,
            ensemble_rows = ensemble_rows,
            rasters = rasters,
            "Exported run output"
        );
        Ok(())
    }
}

/// Models in the ensemble of one (experiment, index).
#[derive(Debug, Serialize)]
pub struct EnsembleMembers {
    pub experiment: String,
    pub index: String,
    pub models: Vec<String>,
    /// Models whose grid differs from the ensemble map's grid.
    pub excluded_from_map: Vec<String>,
}

/// Machine-readable summary of a run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: String,
    pub elapsed_secs: f64,
    pub cancelled: bool,
    pub spread: &'static str,
    pub ensembles: Vec<EnsembleMembers>,
    pub units: &'a [UnitReport],
    pub skips: &'a [SkipRecord],
    pub mask_cache: &'a CacheStats,
    pub mask_cache_hit_rate: f64,
}

impl<'a> RunReport<'a> {
    pub fn from_output(output: &'a RunOutput) -> Self {
        let ensembles = output
            .ensemble_members()
            .into_iter()
            .map(|((experiment, index), models)| {
                let excluded_from_map = output
                    .rasters
                    .iter()
                    .find(|r| r.experiment == experiment && r.index == index)
                    .map(|r| r.excluded.clone())
                    .unwrap_or_default();
                EnsembleMembers {
                    experiment,
                    index,
                    models,
                    excluded_from_map,
                }
            })
            .collect();

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            elapsed_secs: output.elapsed.as_secs_f64(),
            cancelled: output.cancelled,
            spread: output.spread.as_str(),
            ensembles,
            units: &output.units,
            skips: &output.skips,
            mask_cache: &output.mask_cache,
            mask_cache_hit_rate: output.mask_cache.hit_rate(),
        }
    }
}

fn create(path: &Path) -> std::io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Quote a CSV field when it contains a separator or quote.
fn field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Empty cell for NaN, like pandas writes missing values.
fn number(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_quoting() {
        assert_eq!(field("Fynbos"), "Fynbos");
        assert_eq!(field("Albany Thicket, coastal"), "\"Albany Thicket, coastal\"");
        assert_eq!(field("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_nan_written_empty() {
        assert_eq!(number(f64::NAN), "");
        assert_eq!(number(20.5), "20.5");
    }

    #[test]
    fn test_raster_file_name() {
        assert_eq!(
            CsvExporter::raster_file_name("cdd", "ssp245"),
            "cdd_ensemble_mean_ssp245.csv"
        );
    }
}
