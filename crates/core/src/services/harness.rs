//! Validator → sandbox → classifier pipeline over one or many programs.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::outcome::classify;
use super::sandbox::{ExecutionSandbox, ExitStatus, RendererConfig};
use super::validation::{ValidationResult, Validator, ValidatorConfig};
use super::HarnessError;
use crate::model::{Outcome, ProgramInput};

/// Per-stage deadlines, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deadlines {
    pub validate_ms: u64,
    pub execute_ms: u64,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self { validate_ms: 5_000, execute_ms: 10_000 }
    }
}

impl Deadlines {
    pub fn validate(&self) -> Duration {
        Duration::from_millis(self.validate_ms)
    }

    pub fn execute(&self) -> Duration {
        Duration::from_millis(self.execute_ms)
    }
}

/// Result of evaluating one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub outcome: Outcome,
    pub validation: ValidationResult,
    /// Absent when validation failed and the renderer was never invoked.
    pub exit_status: Option<ExitStatus>,
    pub elapsed_ms: u64,
}

impl Evaluation {
    /// Short human-readable reason for a non-ok outcome.
    pub fn detail(&self) -> Option<String> {
        match (&self.validation, self.exit_status) {
            (ValidationResult::Invalid { check, reason }, _) => Some(format!("{check}: {reason}")),
            (ValidationResult::TimedOut { check }, _) => Some(format!("{check}: timed out")),
            (_, Some(ExitStatus::Abnormal { signal: Some(sig), .. })) => {
                Some(format!("terminated by signal {sig}"))
            }
            (_, Some(ExitStatus::Abnormal { code: Some(code), .. })) => {
                Some(format!("crashed with exit code {code}"))
            }
            (_, Some(ExitStatus::NormalWithStderr { code })) => {
                Some(format!("renderer reported errors (exit code {code:?})"))
            }
            (_, Some(ExitStatus::StillRunning)) => Some("deadline exceeded".to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Harness {
    validator: Validator,
    sandbox: ExecutionSandbox,
    deadlines: Deadlines,
}

impl Harness {
    pub fn new(validator: Validator, sandbox: ExecutionSandbox, deadlines: Deadlines) -> Self {
        Self { validator, sandbox, deadlines }
    }

    pub fn from_config(
        validator: ValidatorConfig,
        renderer: RendererConfig,
        deadlines: Deadlines,
    ) -> Self {
        Self::new(Validator::new(validator), ExecutionSandbox::new(renderer), deadlines)
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn sandbox(&self) -> &ExecutionSandbox {
        &self.sandbox
    }

    pub fn deadlines(&self) -> Deadlines {
        self.deadlines
    }

    /// Identity of the renderer setup, as stored alongside recorded outcomes.
    pub fn renderer_id(&self) -> String {
        self.sandbox.config().identity()
    }

    /// Evaluate one program. Never retries.
    pub fn evaluate(&self, input: &ProgramInput) -> Result<Evaluation, HarnessError> {
        let start = Instant::now();
        let validation = self.validator.validate(input, self.deadlines.validate())?;
        if !validation.is_valid() {
            let outcome = classify(&validation, None);
            debug!(%outcome, ?validation, "rejected before execution");
            return Ok(Evaluation {
                outcome,
                validation,
                exit_status: None,
                elapsed_ms: start.elapsed().as_millis() as u64,
            });
        }

        let report = self.sandbox.run(input, self.deadlines.execute())?;
        let outcome = classify(&validation, Some(&report));
        Ok(Evaluation {
            outcome,
            validation,
            exit_status: Some(report.exit_status),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Evaluate `inputs` on a pool of `jobs` worker threads.
    ///
    /// Results come back in input order. Workers share only this harness,
    /// which is immutable; every evaluation spawns its own processes.
    pub fn evaluate_batch(
        &self,
        inputs: &[ProgramInput],
        jobs: usize,
    ) -> Vec<Result<Evaluation, HarnessError>> {
        let jobs = jobs.clamp(1, inputs.len().max(1));
        info!(programs = inputs.len(), jobs, "evaluating batch");

        let (work_tx, work_rx) = crossbeam_channel::unbounded::<(usize, &ProgramInput)>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        for item in inputs.iter().enumerate() {
            // The receiver is alive in this scope, so sending cannot fail.
            let _ = work_tx.send(item);
        }
        drop(work_tx);

        thread::scope(|scope| {
            for _ in 0..jobs {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for (index, input) in work_rx.iter() {
                        if done_tx.send((index, self.evaluate(input))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(done_tx);

        let mut results: Vec<Option<Result<Evaluation, HarnessError>>> =
            inputs.iter().map(|_| None).collect();
        for (index, result) in done_rx.iter() {
            results[index] = Some(result);
        }
        results.into_iter().map(|r| r.unwrap_or(Err(HarnessError::WorkerLost))).collect()
    }
}
