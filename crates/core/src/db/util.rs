use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::db::{load_config, CuratorConfig, OutcomeDb};
use crate::model::ProgramInput;

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Ledger key of a program: the hash of exactly what the renderer receives.
pub fn program_hash(input: &ProgramInput) -> Result<String, serde_json::Error> {
    Ok(match input {
        ProgramInput::RawCode(unit) => sha256_hex(unit.as_bytes()),
        ProgramInput::StructuredProgram(program) => sha256_hex(&serde_json::to_vec(program)?),
    })
}

/// Load the config at `path`, or the defaults when no path is given.
pub fn load_config_or_default(path: Option<&Path>) -> Result<CuratorConfig> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config at {}", path.display())),
        None => Ok(CuratorConfig::default()),
    }
}

/// Open the ledger configured in `config`, if any.
pub fn open_ledger(config: &CuratorConfig) -> Result<Option<OutcomeDb>> {
    let Some(path) = config.ledger.as_deref() else {
        return Ok(None);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create ledger directory {}", parent.display()))?;
    }
    let db = OutcomeDb::open(path)
        .with_context(|| format!("Failed to open outcome ledger at {}", path.display()))?;
    Ok(Some(db))
}
