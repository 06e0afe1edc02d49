use anyhow::{anyhow, Context, Result};
use curator_core::db::open_ledger;
use curator_core::model::Outcome;

use crate::{resolve_config, ConfigOverrides};

/// List recorded outcomes from the ledger.
pub fn outcomes_command(
    overrides: &ConfigOverrides,
    outcome: Option<&str>,
    counts: bool,
    json: bool,
) -> Result<()> {
    let config = resolve_config(overrides)?;
    let db = open_ledger(&config)?
        .ok_or_else(|| anyhow!("No outcome ledger configured (use --ledger or set `ledger`)"))?;

    if counts {
        let counts = db.counts().context("Failed to count outcomes")?;
        if json {
            println!("{}", serde_json::to_string_pretty(&counts)?);
        } else if counts.is_empty() {
            println!("No outcomes recorded.");
        } else {
            for (outcome, n) in &counts {
                println!("{outcome:<10} {n}");
            }
        }
        return Ok(());
    }

    let filter = outcome.map(str::parse::<Outcome>).transpose()?;
    let rows = db.list(filter).context("Failed to list outcomes")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No outcomes recorded.");
        return Ok(());
    }
    for row in rows {
        let short = row.source_hash.get(..12).unwrap_or(&row.source_hash);
        print!("{short}  {:<10} {:>6}ms  {}", row.outcome, row.elapsed_ms, row.recorded_at);
        if let Some(detail) = row.detail {
            print!("  {detail}");
        }
        println!();
    }
    Ok(())
}
