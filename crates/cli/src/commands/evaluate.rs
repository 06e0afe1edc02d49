use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use curator_core::db::{open_ledger, program_hash, OutcomeRecord};
use curator_core::services::{Harness, ValidationResult};
use serde::Serialize;
use tracing::info;

use crate::{read_program, resolve_config, ConfigOverrides};

/// Run the configured validation checks against one program.
pub fn validate_command(path: &Path, overrides: &ConfigOverrides, json: bool) -> Result<()> {
    let config = resolve_config(overrides)?;
    let harness = Harness::from_config(config.validator, config.renderer, config.deadlines);
    let program = read_program(path)?;

    let result = harness
        .validator()
        .validate(&program, config.deadlines.validate())
        .with_context(|| format!("Failed to validate {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    match result {
        ValidationResult::Valid => println!("valid"),
        ValidationResult::Invalid { check, reason } => println!("invalid ({check}): {reason}"),
        ValidationResult::TimedOut { check } => println!("timed out ({check})"),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RunRow {
    path: PathBuf,
    outcome: String,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    /// Taken from the ledger rather than evaluated.
    reused: bool,
}

/// Evaluate programs through validator, sandbox and classifier.
pub fn run_command(paths: &[PathBuf], overrides: &ConfigOverrides, json: bool) -> Result<()> {
    let config = resolve_config(overrides)?;
    let ledger = open_ledger(&config)?;
    let harness = Harness::from_config(config.validator.clone(), config.renderer.clone(), config.deadlines);
    let renderer = harness.renderer_id();

    let mut rows: Vec<Option<RunRow>> = Vec::with_capacity(paths.len());
    let mut pending = Vec::new();
    let mut pending_meta = Vec::new();
    for path in paths {
        let program = read_program(path)?;
        let hash = program_hash(&program)?;
        let known = match &ledger {
            Some(db) => db.lookup(&hash, &renderer).context("Failed to query outcome ledger")?,
            None => None,
        };
        match known {
            Some(row) => rows.push(Some(RunRow {
                path: path.clone(),
                outcome: row.outcome.to_string(),
                elapsed_ms: row.elapsed_ms,
                detail: row.detail,
                reused: true,
            })),
            None => {
                pending_meta.push((rows.len(), path.clone(), hash));
                pending.push(program);
                rows.push(None);
            }
        }
    }

    info!(programs = paths.len(), evaluating = pending.len(), "running programs");
    let results = harness.evaluate_batch(&pending, config.jobs);
    for ((slot, path, hash), result) in pending_meta.into_iter().zip(results) {
        let evaluation =
            result.with_context(|| format!("Failed to evaluate {}", path.display()))?;
        let detail = evaluation.detail();
        if let Some(db) = &ledger {
            let record =
                OutcomeRecord::new(hash, &renderer, evaluation.outcome, evaluation.elapsed_ms)
                    .with_detail(detail.clone());
            db.record(&record).context("Failed to record outcome")?;
        }
        rows[slot] = Some(RunRow {
            path,
            outcome: evaluation.outcome.to_string(),
            elapsed_ms: evaluation.elapsed_ms,
            detail,
            reused: false,
        });
    }
    let rows: Vec<RunRow> = rows.into_iter().flatten().collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in &rows {
        let mut line = format!("{}\t{}\t{}ms", row.path.display(), row.outcome, row.elapsed_ms);
        if let Some(detail) = &row.detail {
            line.push('\t');
            line.push_str(detail);
        }
        if row.reused {
            line.push_str("\t(recorded)");
        }
        println!("{line}");
    }
    Ok(())
}
