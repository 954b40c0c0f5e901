//! Climate index engine.
//!
//! Computes daily-precipitation indices (CDD, CWD, R10mm, ...) on model grids,
//! reduces them to vegetation-biome means per model, and summarises each
//! biome across a multi-model ensemble.
//!
//! - [`mask`] / [`biome`] / [`cache`]: region masks from bounding boxes and
//!   biome polygons, memoised per grid layout.
//! - [`index`]: the [`ClimateIndex`](index::ClimateIndex) contract, built-ins and
//!   the [`IndexRegistry`].
//! - [`aggregate`] / [`ensemble`] / [`raster`]: biome means, ensemble
//!   mean/spread, ensemble mean maps.
//! - [`source`]: where daily grids come from.
//! - [`config`] / [`pipeline`]: run configuration and the orchestrator.

pub mod aggregate;
pub mod biome;
pub mod cache;
pub mod config;
pub mod ensemble;
pub mod geometry;
pub mod index;
pub mod mask;
pub mod pipeline;
pub mod raster;
pub mod source;

pub use aggregate::{BiomeAggregator, BiomeSummary, BiomeValue};
pub use biome::{load_biomes, parse_biomes, BiomeRegion, DEFAULT_NAME_PROPERTY};
pub use cache::{CacheStats, MaskCache, MaskKey};
pub use config::{ExperimentPlan, RunConfig, RunPlan};
pub use ensemble::{EnsembleAggregator, EnsembleStat, Spread};
pub use geometry::Polygon;
pub use index::{
    BuiltinIndex, ClimateIndex, IndexRegistry, IndexResult, IndexSpec, ParamSpec, ResolvedIndex,
    THRESHOLD_MM,
};
pub use mask::RegionMask;
pub use pipeline::{
    CancelFlag, Orchestrator, OutputSink, RunOutput, RunStage, SkipRecord, UnitReport, UnitStatus,
    WHOLE_REGION,
};
pub use raster::{ensemble_rasters, CellClimatology, EnsembleRaster};
pub use source::{GridData, GridSource, MemorySource};

pub use climate_common::{
    Aggregation, BoundingBox, ClimateError, ClimateResult, DailySeries, ErrorScope, Grid, Period,
    TimeRange,
};
