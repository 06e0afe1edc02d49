//! Cheap pre-execution checks.
//!
//! A `Validator` holds only configuration and is passed explicitly to each
//! call. Every check gets its own deadline: external checks run in their own
//! process, the built-in syntax check parses in process and is cancelled when
//! its deadline passes.

use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::process::run_with_deadline;
use super::sandbox::materialize;
use super::HarnessError;
use crate::model::ProgramInput;
use crate::parser::{self, ParserError};

const CHECK_OUTPUT_CAP: usize = 64 * 1024;

/// One validation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Check {
    /// Built-in: the program must parse without error nodes within the deadline.
    Syntax,
    /// External checker invoked as `<program> <args...> <file>`; exit 0 passes.
    Command {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Check {
    pub fn name(&self) -> &str {
        match self {
            Check::Syntax => "syntax",
            Check::Command { name: Some(name), .. } => name,
            Check::Command { program, .. } => program,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_checks")]
    pub checks: Vec<Check>,
}

fn default_checks() -> Vec<Check> {
    vec![Check::Syntax]
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { checks: default_checks() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Invalid { check: String, reason: String },
    TimedOut { check: String },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run the configured checks in order against the image code of `input`,
    /// stopping at the first one that does not pass.
    pub fn validate(
        &self,
        input: &ProgramInput,
        deadline: Duration,
    ) -> Result<ValidationResult, HarnessError> {
        let source = input.image_code();
        let mut file: Option<NamedTempFile> = None;

        for check in &self.config.checks {
            let result = match check {
                Check::Syntax => syntax_check(source, deadline)?,
                Check::Command { program, args, .. } => {
                    let path = match &file {
                        Some(f) => f.path().to_path_buf(),
                        None => {
                            let f = materialize(&ProgramInput::raw(source))?;
                            let path = f.path().to_path_buf();
                            file = Some(f);
                            path
                        }
                    };
                    let mut cmd = Command::new(program);
                    cmd.args(args).arg(path);
                    let output = run_with_deadline(cmd, deadline, CHECK_OUTPUT_CAP)?;
                    if output.timed_out {
                        ValidationResult::TimedOut { check: check.name().to_string() }
                    } else if output.status.success() {
                        ValidationResult::Valid
                    } else {
                        let stderr = output.stderr_lossy();
                        let reason = match stderr.trim() {
                            "" => format!("exited with {}", output.status),
                            msg => msg.to_string(),
                        };
                        ValidationResult::Invalid { check: check.name().to_string(), reason }
                    }
                }
            };
            debug!(check = check.name(), ?result, "validation check finished");
            if !result.is_valid() {
                return Ok(result);
            }
        }

        Ok(ValidationResult::Valid)
    }
}

/// Parse in process, giving up once `deadline` has passed.
fn syntax_check(source: &str, deadline: Duration) -> Result<ValidationResult, HarnessError> {
    let tree = match parser::parse_within(source, deadline) {
        Ok(tree) => tree,
        Err(ParserError::TimedOut(_)) => {
            return Ok(ValidationResult::TimedOut { check: Check::Syntax.name().to_string() })
        }
        Err(err) => return Err(err.into()),
    };
    let Some(node) = tree.first_error() else {
        return Ok(ValidationResult::Valid);
    };
    let line = node.start_position().row + 1;
    let reason = if node.is_missing() {
        format!("missing `{}` at line {line}", node.kind())
    } else {
        format!("malformed {} at line {line}", node.kind())
    };
    Ok(ValidationResult::Invalid { check: Check::Syntax.name().to_string(), reason })
}
