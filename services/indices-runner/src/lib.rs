//! Indices runner: loads a YAML run configuration, reads daily model grids
//! from NetCDF and writes biome and ensemble tables.

pub mod config_loader;
pub mod export;
pub mod report;
pub mod source;

pub use config_loader::{apply_overrides, load_run_config, parse_run_config, Overrides};
pub use export::{CsvExporter, RunReport};
pub use source::NetCdfSource;
