//! Run orchestrator.
//!
//! ```text
//! INIT -> LOAD_REGIONS -> for each (experiment, model):
//!           LOAD_GRID -> MASK -> for each index: COMPUTE -> AGGREGATE_BIOME
//!      -> ENSEMBLE_REDUCE -> EXPORT -> DONE
//! ```
//!
//! Units run in parallel and share nothing but the read-only source, the
//! region geometry and the mask cache. Failures inside a unit are recorded as
//! [`SkipRecord`]s; the run only fails on invalid configuration or when no
//! unit succeeds.

mod output;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use climate_common::{ClimateError, ClimateResult, Grid, SeriesView};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::aggregate::BiomeSummary;
use crate::biome::{load_biomes, BiomeRegion};
use crate::cache::{MaskCache, MaskKey};
use crate::config::{ExperimentPlan, RunPlan};
use crate::mask::RegionMask;
use crate::raster::{ensemble_rasters, CellClimatology};
use crate::source::{GridData, GridSource};

pub use output::{OutputSink, RunOutput, SkipRecord, UnitReport, UnitStatus};

/// Region name used when no biomes are configured.
pub const WHOLE_REGION: &str = "region";

/// Orchestrator states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Init,
    LoadRegions,
    LoadGrid,
    Mask,
    Compute,
    AggregateBiome,
    EnsembleReduce,
    Export,
    Done,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Init => "init",
            RunStage::LoadRegions => "load_regions",
            RunStage::LoadGrid => "load_grid",
            RunStage::Mask => "mask",
            RunStage::Compute => "compute",
            RunStage::AggregateBiome => "aggregate_biome",
            RunStage::EnsembleReduce => "ensemble_reduce",
            RunStage::Export => "export",
            RunStage::Done => "done",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared flag for aborting a run between units.
///
/// Units already running finish; units not yet started are reported as
/// cancelled and left out of the ensemble.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Regions every unit is aggregated over.
struct RegionSet {
    /// Identifies the geometry source in mask cache keys.
    source: String,
    biomes: Option<Vec<BiomeRegion>>,
}

/// Output of one (experiment, model) unit.
struct UnitOutcome {
    report: UnitReport,
    summaries: Vec<BiomeSummary>,
    climatologies: Vec<CellClimatology>,
    skips: Vec<SkipRecord>,
}

/// Drives a validated [`RunPlan`] against a [`GridSource`].
pub struct Orchestrator {
    source: Arc<dyn GridSource>,
    masks: Arc<MaskCache>,
    regions: Option<Vec<BiomeRegion>>,
    cancel: CancelFlag,
    threads: Option<usize>,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn GridSource>) -> Self {
        Self {
            source,
            masks: Arc::new(MaskCache::new()),
            regions: None,
            cancel: CancelFlag::new(),
            threads: None,
        }
    }

    /// Share a mask cache with other orchestrators.
    pub fn with_mask_cache(mut self, masks: Arc<MaskCache>) -> Self {
        self.masks = masks;
        self
    }

    /// Use these biomes instead of loading the plan's biome file.
    pub fn with_regions(mut self, regions: Vec<BiomeRegion>) -> Self {
        self.regions = Some(regions);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run units on a dedicated pool of `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn mask_cache(&self) -> &Arc<MaskCache> {
        &self.masks
    }

    /// Run every unit and reduce the ensemble, without exporting.
    pub fn run(&self, plan: &RunPlan) -> ClimateResult<RunOutput> {
        self.execute(plan, None)
    }

    /// Run, then hand the output to `sink`.
    pub fn run_and_export(&self, plan: &RunPlan, sink: &dyn OutputSink) -> ClimateResult<RunOutput> {
        self.execute(plan, Some(sink))
    }

    fn execute(&self, plan: &RunPlan, sink: Option<&dyn OutputSink>) -> ClimateResult<RunOutput> {
        let started = Instant::now();

        enter(RunStage::Init);
        info!(
            indices = ?plan.index_names(),
            experiments = plan.experiments.len(),
            models = plan.models.len(),
            "Starting climate index run"
        );

        enter(RunStage::LoadRegions);
        let regions = self.load_regions(plan)?;

        let mut skips = Vec::new();
        let units = self.enumerate_units(plan, &mut skips);
        info!(units = units.len(), "Processing model units");

        let outcomes = self.run_units(plan, &regions, &units)?;

        enter(RunStage::EnsembleReduce);
        let mut reports = Vec::with_capacity(outcomes.len());
        let mut summaries = Vec::new();
        let mut climatologies = Vec::new();
        for outcome in outcomes {
            reports.push(outcome.report);
            summaries.extend(outcome.summaries);
            climatologies.extend(outcome.climatologies);
            skips.extend(outcome.skips);
        }

        let succeeded = reports
            .iter()
            .filter(|r| r.status == UnitStatus::Succeeded)
            .count();
        let cancelled = self.cancel.is_cancelled();
        if succeeded == 0 && !cancelled {
            error!(units = reports.len(), skips = skips.len(), "No model unit succeeded");
            return Err(ClimateError::AllModelsFailed(reports.len()));
        }

        let ensemble = plan.ensemble.reduce(&summaries);
        let rasters = ensemble_rasters(&climatologies);
        for raster in rasters.iter().filter(|r| !r.excluded.is_empty()) {
            warn!(
                experiment = %raster.experiment,
                index = %raster.index,
                excluded = ?raster.excluded,
                "Models on a different grid left out of the ensemble map"
            );
        }

        let mask_cache = self.masks.stats();
        debug!(
            hits = mask_cache.hits,
            misses = mask_cache.misses,
            entries = mask_cache.entries,
            hit_rate = mask_cache.hit_rate(),
            "Mask cache statistics"
        );

        let output = RunOutput {
            summaries,
            ensemble,
            rasters,
            units: reports,
            skips,
            mask_cache,
            spread: plan.ensemble.spread(),
            elapsed: started.elapsed(),
            cancelled,
        };

        if let Some(sink) = sink {
            enter(RunStage::Export);
            sink.export(&output)?;
        }

        enter(RunStage::Done);
        info!(
            succeeded = output.succeeded(),
            skipped = output.skipped(),
            cancelled = output.cancelled,
            elapsed_ms = output.elapsed.as_millis() as u64,
            "Climate index run complete"
        );
        Ok(output)
    }

    fn load_regions(&self, plan: &RunPlan) -> ClimateResult<RegionSet> {
        if let Some(regions) = &self.regions {
            return Ok(RegionSet {
                source: "provided".to_string(),
                biomes: Some(regions.clone()),
            });
        }
        match &plan.biomes {
            Some(cfg) => {
                let biomes = load_biomes(&cfg.path, &cfg.name_property)?;
                info!(path = %cfg.path.display(), biomes = biomes.len(), "Loaded biome regions");
                Ok(RegionSet {
                    source: cfg.path.display().to_string(),
                    biomes: Some(biomes),
                })
            }
            None => Ok(RegionSet {
                source: WHOLE_REGION.to_string(),
                biomes: None,
            }),
        }
    }

    /// (experiment, model) pairs in deterministic order.
    fn enumerate_units<'p>(
        &self,
        plan: &'p RunPlan,
        skips: &mut Vec<SkipRecord>,
    ) -> Vec<(&'p ExperimentPlan, String)> {
        let variables = plan.variables();
        let primary = variables.first().map(String::as_str).unwrap_or("pr");

        let mut units = Vec::new();
        for experiment in &plan.experiments {
            let models = if plan.models.is_empty() {
                match self.source.models(primary, &experiment.name) {
                    Ok(models) => models,
                    Err(e) => {
                        warn!(experiment = %experiment.name, error = %e, "Failed to list models");
                        skips.push(SkipRecord::from_error(&experiment.name, None, &e));
                        continue;
                    }
                }
            } else {
                plan.models.clone()
            };

            if models.is_empty() {
                let e = ClimateError::data_unavailable(
                    "*",
                    &experiment.name,
                    format!("no model offers {}", primary),
                );
                warn!(experiment = %experiment.name, "No models available");
                skips.push(SkipRecord::from_error(&experiment.name, None, &e));
                continue;
            }

            units.extend(models.into_iter().map(|m| (experiment, m)));
        }
        units
    }

    fn run_units(
        &self,
        plan: &RunPlan,
        regions: &RegionSet,
        units: &[(&ExperimentPlan, String)],
    ) -> ClimateResult<Vec<UnitOutcome>> {
        let work = || {
            units
                .par_iter()
                .map(|(experiment, model)| self.run_unit(plan, regions, experiment, model))
                .collect::<Vec<_>>()
        };

        match self.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        ClimateError::config_invalid(format!("failed to build thread pool: {}", e))
                    })?;
                Ok(pool.install(work))
            }
            None => Ok(work()),
        }
    }

    fn run_unit(
        &self,
        plan: &RunPlan,
        regions: &RegionSet,
        experiment: &ExperimentPlan,
        model: &str,
    ) -> UnitOutcome {
        let started = Instant::now();
        let mut outcome = UnitOutcome {
            report: UnitReport {
                experiment: experiment.name.clone(),
                model: model.to_string(),
                status: UnitStatus::Skipped,
                indices: 0,
                elapsed_ms: 0,
            },
            summaries: Vec::new(),
            climatologies: Vec::new(),
            skips: Vec::new(),
        };

        if self.cancel.is_cancelled() {
            debug!(model = model, experiment = %experiment.name, "Unit cancelled before start");
            outcome.report.status = UnitStatus::Cancelled;
            return outcome;
        }

        match self.process_unit(plan, regions, experiment, model, &mut outcome) {
            Ok(()) if outcome.summaries.is_empty() => {
                warn!(model = model, experiment = %experiment.name, "No index succeeded, skipping unit");
            }
            Ok(()) => {
                outcome.report.status = UnitStatus::Succeeded;
                outcome.report.indices = outcome.summaries.len();
                info!(
                    model = model,
                    experiment = %experiment.name,
                    indices = outcome.summaries.len(),
                    skips = outcome.skips.len(),
                    "Unit complete"
                );
            }
            Err(e) => {
                warn!(
                    model = model,
                    experiment = %experiment.name,
                    kind = e.kind(),
                    error = %e,
                    "Skipping unit"
                );
                outcome
                    .skips
                    .push(SkipRecord::from_error(&experiment.name, Some(model), &e));
            }
        }

        outcome.report.elapsed_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    fn process_unit(
        &self,
        plan: &RunPlan,
        regions: &RegionSet,
        experiment: &ExperimentPlan,
        model: &str,
        outcome: &mut UnitOutcome,
    ) -> ClimateResult<()> {
        debug!(stage = %RunStage::LoadGrid, model = model, experiment = %experiment.name);
        let mut inputs: BTreeMap<String, Arc<GridData>> = BTreeMap::new();
        for variable in plan.variables() {
            let data = self
                .source
                .load(model, &experiment.name, &variable, experiment.range)?;
            if let Some(first) = inputs.values().next() {
                if !first.grid.same_coordinates(&data.grid) {
                    return Err(ClimateError::InvalidGrid(format!(
                        "{} is not on the same grid as the other variables",
                        variable
                    )));
                }
            }
            inputs.insert(variable, data);
        }
        let grid = match inputs.values().next() {
            Some(data) => &data.grid,
            None => return Err(ClimateError::config_invalid("no input variables")),
        };

        debug!(stage = %RunStage::Mask, model = model, experiment = %experiment.name, grid = %grid.key());
        let masks = self.unit_masks(plan, regions, grid, experiment, model, &mut outcome.skips)?;
        let mut union = RegionMask::from_cells(grid.ny(), grid.nx(), vec![false; grid.n_cells()])?;
        for (_, mask) in &masks {
            union = union.union(mask)?;
        }

        for index in &plan.indices {
            let name = index.name();
            let data = match inputs.get(index.index.variable()) {
                Some(data) => data,
                None => continue,
            };

            debug!(stage = %RunStage::Compute, model = model, experiment = %experiment.name, index = name);
            let view = SeriesView::new(&data.grid, &data.series)?.with_window(experiment.range);
            let result = match index.compute(view, &union) {
                Ok(result) => result,
                Err(e) => {
                    warn!(model = model, experiment = %experiment.name, index = name, error = %e, "Index failed");
                    outcome.skips.push(
                        SkipRecord::from_error(&experiment.name, Some(model), &e).with_index(name),
                    );
                    continue;
                }
            };

            debug!(stage = %RunStage::AggregateBiome, model = model, experiment = %experiment.name, index = name);
            let mut values = Vec::new();
            for (biome, mask) in &masks {
                match plan.aggregator.summarize(&result, mask, biome) {
                    Ok(biome_values) => {
                        for rejected in biome_values.iter().filter(|v| v.issue.is_some()) {
                            let e = ClimateError::InsufficientData {
                                biome: biome.clone(),
                                period: rejected.period.label(),
                                valid: rejected.valid_cells,
                                total: rejected.total_cells,
                            };
                            outcome.skips.push(
                                SkipRecord::from_error(&experiment.name, Some(model), &e)
                                    .with_biome(biome)
                                    .with_index(name)
                                    .with_period(&rejected.period),
                            );
                        }
                        values.extend(biome_values);
                    }
                    Err(e) => outcome.skips.push(
                        SkipRecord::from_error(&experiment.name, Some(model), &e)
                            .with_biome(biome)
                            .with_index(name),
                    ),
                }
            }

            if plan.output.raster {
                outcome
                    .climatologies
                    .push(CellClimatology::from_result(model, &experiment.name, &result, &data.grid));
            }
            outcome.summaries.push(BiomeSummary {
                model: model.to_string(),
                experiment: experiment.name.clone(),
                index: name.to_string(),
                aggregation: result.aggregation,
                values,
            });
        }

        Ok(())
    }

    /// Masks of every region overlapping this grid, built before any
    /// index is computed.
    ///
    /// Biomes outside the grid are recorded and dropped; the unit fails with
    /// `EmptyMask` when nothing is left.
    fn unit_masks(
        &self,
        plan: &RunPlan,
        regions: &RegionSet,
        grid: &Grid,
        experiment: &ExperimentPlan,
        model: &str,
        skips: &mut Vec<SkipRecord>,
    ) -> ClimateResult<Vec<(String, Arc<RegionMask>)>> {
        let clip_key = plan
            .region
            .map(|b| b.cache_key())
            .unwrap_or_else(|| "*".to_string());

        let clip = match &plan.region {
            Some(bbox) => Some(self.masks.get_or_build(
                MaskKey {
                    region: WHOLE_REGION.to_string(),
                    variant: format!("bbox:{}", clip_key),
                    grid: grid.key(),
                },
                || RegionMask::from_bbox(grid, bbox, WHOLE_REGION),
            )?),
            None => None,
        };

        let biomes = match &regions.biomes {
            Some(biomes) => biomes,
            None => {
                let mask = clip.unwrap_or_else(|| Arc::new(RegionMask::full(grid)));
                return Ok(vec![(WHOLE_REGION.to_string(), mask)]);
            }
        };

        let mut masks = Vec::with_capacity(biomes.len());
        for biome in biomes {
            let key = MaskKey {
                region: biome.name().to_string(),
                variant: format!("{}#{}|{}", regions.source, biome.id(), clip_key),
                grid: grid.key(),
            };
            let built = self.masks.get_or_build(key, || {
                let mask = biome.mask(grid)?;
                match &clip {
                    Some(clip) => mask.intersect(clip)?.non_empty(biome.name()),
                    None => Ok(mask),
                }
            });
            match built {
                Ok(mask) => masks.push((biome.name().to_string(), mask)),
                Err(e @ ClimateError::EmptyMask { .. }) => {
                    debug!(model = model, biome = biome.name(), "Biome does not overlap grid");
                    skips.push(
                        SkipRecord::from_error(&experiment.name, Some(model), &e)
                            .with_biome(biome.name()),
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if masks.is_empty() {
            return Err(ClimateError::empty_mask("every biome"));
        }
        Ok(masks)
    }
}

fn enter(stage: RunStage) {
    info!(stage = %stage, "Run stage");
}
