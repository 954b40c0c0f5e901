//! Climate indices runner.
//!
//! Computes daily precipitation indices for every selected model and
//! experiment, averages them over vegetation biomes and writes:
//! - per-model biome tables
//! - ensemble mean/spread tables
//! - ensemble mean maps and a JSON run report

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use climate_common::BoundingBox;
use climate_indices::{IndexRegistry, Orchestrator};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use indices_runner::{apply_overrides, load_run_config, report, CsvExporter, NetCdfSource, Overrides};

#[derive(Parser, Debug)]
#[command(name = "indices-runner")]
#[command(about = "Climate indices with biome and multi-model ensemble summaries")]
struct Args {
    /// Run configuration (YAML)
    #[arg(short, long, env = "INDICES_CONFIG", default_value = "config/climate_indices.yml")]
    config: PathBuf,

    /// Root of the downloaded grids: <data-dir>/<variable>/<MODEL>/<experiment>/*.nc
    #[arg(long, env = "CLIMATE_DATA_DIR", default_value = "data/cmip6")]
    data_dir: PathBuf,

    /// Output directory (overrides output.dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Index to compute; repeat to select several (replaces run_indices)
    #[arg(long = "index")]
    indices: Vec<String>,

    /// Model to include; repeat to select several
    #[arg(long = "model")]
    models: Vec<String>,

    /// Experiment to run; repeat to select several
    #[arg(long = "experiment")]
    experiments: Vec<String>,

    /// Region as lat_min,lat_max,lon_min,lon_max
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<String>,

    /// Worker threads for model units (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if args.json_logs {
        fmt().with_env_filter(filter).with_target(true).json().init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }

    netcdf_parser::silence_hdf5_errors();
    if !netcdf_parser::native_available() {
        warn!("Built without the `netcdf` feature: model grids cannot be read");
    }

    let mut config = load_run_config(&args.config)?;
    let region = args
        .bbox
        .as_deref()
        .map(BoundingBox::from_arg_string)
        .transpose()
        .context("Invalid --bbox")?;
    apply_overrides(
        &mut config,
        &Overrides {
            indices: args.indices.clone(),
            models: args.models.clone(),
            experiments: args.experiments.clone(),
            region,
            output_dir: args.output_dir.clone(),
        },
    );

    let registry = IndexRegistry::with_builtins();
    let plan = config
        .validate(&registry)
        .with_context(|| format!("Invalid run configuration: {}", args.config.display()))?;

    info!(
        indices = ?plan.index_names(),
        experiments = ?plan.experiments.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        data_dir = %args.data_dir.display(),
        output_dir = %plan.output.dir.display(),
        "Configuration loaded"
    );

    if args.check {
        println!("Configuration OK: {} index(es), {} experiment(s)", plan.indices.len(), plan.experiments.len());
        return Ok(());
    }

    let mut orchestrator = Orchestrator::new(Arc::new(NetCdfSource::new(&args.data_dir)));
    if let Some(threads) = args.threads {
        orchestrator = orchestrator.with_threads(threads);
    }

    let exporter = CsvExporter::new(&plan.output.dir);
    let output = orchestrator
        .run_and_export(&plan, &exporter)
        .context("Climate index run failed")?;

    println!("{}", report::format_unit_table(&output));
    println!("{}", report::format_run_summary(&output));
    Ok(())
}
