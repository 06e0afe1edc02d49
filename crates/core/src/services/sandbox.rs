//! Isolated execution of one program through an external renderer.
//!
//! The renderer may abort its whole process (driver faults surface as Rust
//! panics or signals), so every run gets a dedicated child process and a fresh
//! temporary copy of the program that is removed when the call returns.

use std::io::Write;
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::process::{run_with_deadline, ProcessOutput};
use super::HarnessError;
use crate::model::ProgramInput;

/// Token a renderer prints as its last stdout line for programs it cannot fully render.
pub const UNSUPPORTED_TOKEN: &str = "incomplete";

/// How to invoke the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Renderer executable.
    pub program: String,
    /// Extra arguments placed before the render-target flags.
    pub args: Vec<String>,
    pub width: u32,
    pub height: u32,
    /// Shader time of the rendered frame, in seconds.
    pub frame_time: f64,
    /// Exit codes treated as an abnormal termination (101 is a Rust panic).
    pub crash_exit_codes: Vec<i32>,
    /// Per-stream capture limit.
    pub output_cap_bytes: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "shadertoy-render".to_string(),
            args: Vec::new(),
            width: 800,
            height: 450,
            frame_time: 0.0,
            crash_exit_codes: vec![101],
            output_cap_bytes: 256 * 1024,
        }
    }
}

impl RendererConfig {
    /// Stable identity of this renderer setup, used to key recorded outcomes.
    pub fn identity(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(format!("{}x{}@{}", self.width, self.height, self.frame_time));
        parts.join(" ")
    }
}

/// How the sandboxed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExitStatus {
    /// Exit code 0 and nothing on stderr.
    Normal,
    /// Normal termination that signalled failure through stderr or a non-zero code.
    NormalWithStderr { code: Option<i32> },
    /// Killed by a fault signal or exited with a configured crash code.
    Abnormal { signal: Option<i32>, code: Option<i32> },
    /// Still running at the deadline; forcibly terminated.
    StillRunning,
}

/// Everything observed about one sandboxed run.
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxReport {
    pub exit_status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl SandboxReport {
    /// The renderer flagged the program as structurally unsupported.
    pub fn reports_unsupported(&self) -> bool {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last() == Some(UNSUPPORTED_TOKEN)
    }
}

/// Runs programs through the configured renderer, one child process per call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSandbox {
    config: RendererConfig,
}

impl ExecutionSandbox {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Render one frame of `input` in a fresh process, bounded by `deadline`.
    pub fn run(&self, input: &ProgramInput, deadline: Duration) -> Result<SandboxReport, HarnessError> {
        let program_file = materialize(input)?;

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg("--width")
            .arg(self.config.width.to_string())
            .arg("--height")
            .arg(self.config.height.to_string())
            .arg("--time")
            .arg(self.config.frame_time.to_string())
            .arg(program_file.path());

        let output = run_with_deadline(cmd, deadline, self.config.output_cap_bytes)?;
        let report = self.report(&output, deadline);
        debug!(exit_status = ?report.exit_status, elapsed_ms = report.elapsed.as_millis() as u64, "sandbox run finished");

        // Dropping the handle deletes the file; be explicit about when.
        drop(program_file);
        Ok(report)
    }

    fn report(&self, output: &ProcessOutput, deadline: Duration) -> SandboxReport {
        let stdout = output.stdout_lossy();
        let stderr = output.stderr_lossy();
        if output.timed_out {
            return SandboxReport {
                exit_status: ExitStatus::StillRunning,
                stdout,
                stderr,
                elapsed: deadline,
            };
        }

        let code = output.status.code();
        let signal = output.signal();
        let exit_status = if signal.is_some()
            || code.is_some_and(|c| self.config.crash_exit_codes.contains(&c))
        {
            ExitStatus::Abnormal { signal, code }
        } else if code != Some(0) || !output.stderr.is_empty() {
            ExitStatus::NormalWithStderr { code }
        } else {
            ExitStatus::Normal
        };

        SandboxReport { exit_status, stdout, stderr, elapsed: output.elapsed }
    }
}

/// Write the program into a uniquely named temporary file that is deleted on drop.
///
/// Raw code becomes a `.frag` file; structured programs are serialized as `.json`
/// so the renderer receives auxiliary passes and inputs untouched.
pub(crate) fn materialize(input: &ProgramInput) -> Result<NamedTempFile, HarnessError> {
    let (suffix, bytes) = match input {
        ProgramInput::RawCode(unit) => (".frag", unit.as_bytes().to_vec()),
        ProgramInput::StructuredProgram(program) => (".json", serde_json::to_vec(program)?),
    };
    let mut file = tempfile::Builder::new()
        .prefix("curator-")
        .suffix(suffix)
        .tempfile()
        .map_err(HarnessError::TempFile)?;
    file.write_all(&bytes).map_err(HarnessError::TempFile)?;
    file.flush().map_err(HarnessError::TempFile)?;
    Ok(file)
}
