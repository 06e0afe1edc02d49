use std::path::Path;

use anyhow::{Context, Result};
use curator_core::db::open_ledger;
use curator_core::services::annotate::{Annotator, Column, Mode};
use curator_core::services::Harness;

use crate::{resolve_config, ConfigOverrides};

/// Annotate every `.jsonl` dataset file in a directory.
pub fn annotate_command(
    input: &Path,
    output: &Path,
    mode: &str,
    columns: &str,
    overrides: &ConfigOverrides,
) -> Result<()> {
    let mode: Mode = mode.parse()?;
    let columns = Column::parse_list(columns)?;
    let config = resolve_config(overrides)?;
    let ledger = open_ledger(&config)?;
    let harness = Harness::from_config(config.validator.clone(), config.renderer.clone(), config.deadlines);

    let annotator =
        Annotator::new(&harness).with_ledger(ledger.as_ref()).with_jobs(config.jobs);
    let summary = annotator
        .annotate_dir(input, output, mode, &columns)
        .with_context(|| format!("Failed to annotate {}", input.display()))?;

    let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
    println!("Annotated {} file(s), {} record(s):", summary.files, summary.records);
    println!("  Columns: {}", if names.is_empty() { "(none)".to_string() } else { names.join(", ") });
    println!("  Functions: {}", summary.functions);
    println!("  Tested: {}", summary.tested);
    println!("  Reused from ledger: {}", summary.reused);
    println!("  Skipped: {}", summary.skipped);
    Ok(())
}
