//! Execution services: validator, sandbox, classifier, and the harness that
//! chains them, plus dataset annotation on top.
//!
//! Every external tool runs in a freshly spawned process bounded by a deadline.
//! Crashes, hangs and rejected programs are reported as data; only failures of
//! the machinery itself (spawning, temp files) surface as `HarnessError`.

use std::io;

use thiserror::Error;

use crate::parser::ParserError;

pub mod annotate;
pub mod harness;
pub mod outcome;
pub mod process;
pub mod sandbox;
pub mod validation;

pub use harness::{Deadlines, Evaluation, Harness};
pub use outcome::classify;
pub use sandbox::{ExecutionSandbox, ExitStatus, RendererConfig, SandboxReport};
pub use validation::{Check, ValidationResult, Validator, ValidatorConfig};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to materialize program source: {0}")]
    TempFile(#[source] io::Error),
    #[error("Failed to serialize structured program: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error("Worker thread terminated without a result")]
    WorkerLost,
}
