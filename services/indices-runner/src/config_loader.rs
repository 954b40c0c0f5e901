//! Configuration loader for the indices runner.
//!
//! Reads the YAML run configuration, substitutes environment variables
//! (`${VAR}` and `${VAR:-default}`) and applies command-line overrides.
//! Semantic validation is left to [`RunConfig::validate`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use climate_common::BoundingBox;
use climate_indices::RunConfig;

/// Values given on the command line that replace configured ones.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub indices: Vec<String>,
    pub models: Vec<String>,
    pub experiments: Vec<String>,
    pub region: Option<BoundingBox>,
    pub output_dir: Option<PathBuf>,
}

/// Load a run configuration file.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run config: {}", path.display()))?;
    parse_run_config(&content).with_context(|| format!("Invalid run config: {}", path.display()))
}

/// Parse configuration text after environment substitution.
pub fn parse_run_config(content: &str) -> Result<RunConfig> {
    let expanded = expand_env_vars(content)?;
    Ok(RunConfig::from_yaml_str(&expanded)?)
}

/// Replace configured values with any given on the command line.
pub fn apply_overrides(config: &mut RunConfig, overrides: &Overrides) {
    if !overrides.indices.is_empty() {
        config.run_indices = overrides.indices.clone();
    }
    if !overrides.models.is_empty() {
        config.models.select = overrides.models.clone();
    }
    if !overrides.experiments.is_empty() {
        config.experiments.select = overrides.experiments.clone();
    }
    if let Some(region) = overrides.region {
        config.region = Some(region);
    }
    if let Some(dir) = &overrides.output_dir {
        config.output.dir = dir.clone();
    }
}

/// Expand environment variables in configuration content.
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_expr = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => var_expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
            }
        }
        result.push_str(&resolve_var_expr(&var_expr)?);
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}
