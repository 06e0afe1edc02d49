use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shader_curator::{
    annotate_command, functions_command, init_config_command, init_tracing, outcomes_command,
    run_command, validate_command, ConfigOverrides,
};
use tracing::Level;

/// Shader dataset curation CLI.
///
/// This CLI is a thin wrapper around `curator-core` (exposed in code as
/// `curator_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "shader-curator",
    version,
    about = "Parse, validate and sandbox-run fragment shader programs",
    long_about = None
)]
struct Cli {
    /// Log debug events (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List function boundaries of a program as byte-offset 5-tuples:
    /// start_comment, start_header, end_header, end_docstring, end_function.
    Functions {
        /// Program source, or a `.json` program record.
        path: PathBuf,

        /// Also report the span of the file's opening comment block.
        #[arg(long, default_value_t = false)]
        header: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run the configured validation checks against a program.
    Validate {
        /// Program source, or a `.json` program record.
        path: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Validate and execute programs in isolated renderer processes and
    /// classify each outcome (ok, incomplete, error, timeout, panic).
    Run {
        /// Program sources or `.json` program records.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Annotate `.jsonl` dataset files with function records and outcomes.
    Annotate {
        /// Directory of raw `.jsonl` files (read in `redo` mode).
        #[arg(long, default_value = "./data/raw/")]
        input: PathBuf,

        /// Directory of annotated `.jsonl` files.
        #[arg(long, default_value = "./data/annotated/")]
        output: PathBuf,

        /// `redo` annotates input into output; `update` rewrites output in place.
        #[arg(long, default_value = "update")]
        mode: String,

        /// Comma-separated columns: functions, test, all.
        #[arg(long)]
        columns: String,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Write a default config file (JSON or YAML, by extension).
    InitConfig {
        #[arg(long, default_value = "curator.yaml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// List outcomes recorded in the ledger.
    Outcomes {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Only show one outcome (ok, incomplete, error, timeout, panic).
        #[arg(long)]
        outcome: Option<String>,

        /// Show per-outcome counts instead of rows.
        #[arg(long, default_value_t = false)]
        counts: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, if cli.verbose { Level::DEBUG } else { Level::WARN });

    match cli.command {
        Command::Functions { path, header, json } => functions_command(&path, json, header)?,
        Command::Validate { path, overrides, json } => validate_command(&path, &overrides, json)?,
        Command::Run { paths, overrides, json } => run_command(&paths, &overrides, json)?,
        Command::Annotate { input, output, mode, columns, overrides } => {
            annotate_command(&input, &output, &mode, &columns, &overrides)?
        }
        Command::InitConfig { path, force } => init_config_command(&path, force)?,
        Command::Outcomes { overrides, outcome, counts, json } => {
            outcomes_command(&overrides, outcome.as_deref(), counts, json)?
        }
    }

    Ok(())
}
