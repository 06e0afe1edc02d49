//! Mapping of validator and sandbox results to a single `Outcome`.

use super::sandbox::{ExitStatus, SandboxReport};
use super::validation::ValidationResult;
use crate::model::Outcome;

/// Classify one execution attempt.
///
/// Static rejection wins over anything observed at runtime; a valid program
/// that never reached the renderer counts as an error.
pub fn classify(validation: &ValidationResult, report: Option<&SandboxReport>) -> Outcome {
    match validation {
        ValidationResult::Invalid { .. } => Outcome::Error,
        ValidationResult::TimedOut { .. } => Outcome::Timeout,
        ValidationResult::Valid => match report {
            None => Outcome::Error,
            Some(report) => match report.exit_status {
                ExitStatus::StillRunning => Outcome::Timeout,
                ExitStatus::Abnormal { .. } => Outcome::Crash,
                ExitStatus::NormalWithStderr { .. } => Outcome::Error,
                ExitStatus::Normal if report.reports_unsupported() => Outcome::Incomplete,
                ExitStatus::Normal => Outcome::Ok,
            },
        },
    }
}
