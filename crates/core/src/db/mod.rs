//! Persistence and configuration.
//!
//! - `CuratorConfig`: renderer, validator, deadlines, pool size and ledger path,
//!   loaded from JSON or YAML.
//! - `OutcomeDb`: SQLite ledger of recorded outcomes, keyed by source hash and
//!   renderer identity.

mod config;
mod models;
mod outcome_db;
mod util;

pub use config::{load_config, save_config, ConfigError, CuratorConfig};
pub use models::OutcomeRecord;
pub use outcome_db::{DbError, DbResult, OutcomeDb, CURRENT_SCHEMA_VERSION};
pub use util::{load_config_or_default, open_ledger, program_hash, sha256_hex};
