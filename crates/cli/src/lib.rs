use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use curator_core::db::{load_config_or_default, CuratorConfig};
use curator_core::model::ProgramInput;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub mod commands;

pub use commands::*;

/// Initialise the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`. Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}

/// Command-line overrides applied on top of the loaded config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Config file (JSON or YAML). Defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Renderer executable.
    #[arg(long)]
    pub renderer: Option<String>,

    /// Validation deadline in milliseconds.
    #[arg(long)]
    pub validate_ms: Option<u64>,

    /// Execution deadline in milliseconds.
    #[arg(long)]
    pub execute_ms: Option<u64>,

    /// Concurrent evaluations.
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Outcome ledger (SQLite file).
    #[arg(long)]
    pub ledger: Option<PathBuf>,
}

/// Load the config file (or defaults) and apply command-line overrides.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<CuratorConfig> {
    let mut config = load_config_or_default(overrides.config.as_deref())?;
    if let Some(program) = &overrides.renderer {
        config.renderer.program = program.clone();
    }
    if let Some(ms) = overrides.validate_ms {
        config.deadlines.validate_ms = ms;
    }
    if let Some(ms) = overrides.execute_ms {
        config.deadlines.execute_ms = ms;
    }
    if let Some(jobs) = overrides.jobs {
        config.jobs = jobs.max(1);
    }
    if let Some(ledger) = &overrides.ledger {
        config.ledger = Some(ledger.clone());
    }
    Ok(config)
}

/// Read a program from disk.
///
/// `.json` files hold one program record (or a JSON string of code); anything
/// else is taken as raw source.
pub fn read_program(path: &Path) -> Result<ProgramInput> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read program at {}", path.display()))?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse program JSON at {}", path.display()))?;
        let program = ProgramInput::from_value(&value)
            .with_context(|| format!("Unsupported program record at {}", path.display()))?;
        Ok(program)
    } else {
        Ok(ProgramInput::raw(text))
    }
}
