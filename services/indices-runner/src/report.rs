//! Console summaries of a run.

use std::collections::{BTreeMap, BTreeSet};

use climate_indices::{RunOutput, UnitStatus};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Per-model status across experiments, like a download summary.
pub fn format_unit_table(output: &RunOutput) -> String {
    let experiments: BTreeSet<&str> = output.units.iter().map(|u| u.experiment.as_str()).collect();
    let mut by_model: BTreeMap<&str, BTreeMap<&str, UnitStatus>> = BTreeMap::new();
    for unit in &output.units {
        by_model
            .entry(unit.model.as_str())
            .or_default()
            .insert(unit.experiment.as_str(), unit.status);
    }

    let mut header = vec!["Model".to_string()];
    header.extend(experiments.iter().map(|e| e.to_string()));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);

    for (model, statuses) in &by_model {
        let mut row = vec![model.to_string()];
        row.extend(experiments.iter().map(|e| match statuses.get(e) {
            Some(UnitStatus::Succeeded) => "ok".to_string(),
            Some(status) => status.as_str().to_string(),
            None => "-".to_string(),
        }));
        table.add_row(row);
    }

    table.to_string()
}

/// Run totals: units, skips, ensemble rows, cache use.
pub fn format_run_summary(output: &RunOutput) -> String {
    let mut skips_by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for skip in &output.skips {
        *skips_by_kind.entry(skip.kind).or_default() += 1;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Climate Index Run", ""]);

    table.add_row(vec!["Duration:".to_string(), format!("{:.1}s", output.elapsed.as_secs_f64())]);
    table.add_row(vec![
        "Units:".to_string(),
        format!(
            "{} succeeded / {} skipped / {} total",
            output.succeeded(),
            output.skipped(),
            output.units.len()
        ),
    ]);
    table.add_row(vec!["Model rows:".to_string(), output.summaries.len().to_string()]);
    table.add_row(vec!["Ensemble rows:".to_string(), output.ensemble.len().to_string()]);
    table.add_row(vec!["Ensemble maps:".to_string(), output.rasters.len().to_string()]);
    table.add_row(vec!["Spread:".to_string(), output.spread.to_string()]);
    table.add_row(vec![
        "Mask cache hit rate:".to_string(),
        format!("{:.1}%", output.mask_cache.hit_rate() * 100.0),
    ]);
    for (kind, count) in &skips_by_kind {
        table.add_row(vec![format!("Skipped ({}):", kind), count.to_string()]);
    }
    if output.cancelled {
        table.add_row(vec!["Cancelled:".to_string(), "yes".to_string()]);
    }

    table.to_string()
}
