#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use curator_core::model::{Outcome, ProgramInput};
use curator_core::services::{Deadlines, Harness, RendererConfig, ValidatorConfig};
use tempfile::tempdir;

/// Fake renderer whose behavior is chosen by a marker in the program text.
fn renderer(dir: &Path, marker: &Path) -> RendererConfig {
    let script: PathBuf = dir.join("render.sh");
    let body = format!(
        r#"#!/bin/sh
for arg in "$@"; do last="$arg"; done
touch '{marker}'
if grep -q CRASH "$last"; then kill -SEGV $$; fi
if grep -q HANG "$last"; then sleep 30; fi
if grep -q NOISY "$last"; then echo 'warning: something' >&2; fi
if grep -q PARTIAL "$last"; then echo incomplete; fi
exit 0
"#,
        marker = marker.display()
    );
    fs::write(&script, body).expect("write renderer");
    RendererConfig {
        program: "sh".to_string(),
        args: vec![script.display().to_string()],
        ..RendererConfig::default()
    }
}

fn program(tag: &str) -> ProgramInput {
    ProgramInput::raw(format!("// {tag}\nvoid mainImage(out vec4 c, in vec2 p) {{ c = vec4(1.0); }}\n"))
}

fn harness(dir: &Path, marker: &Path) -> Harness {
    Harness::from_config(
        ValidatorConfig::default(),
        renderer(dir, marker),
        Deadlines { validate_ms: 2_000, execute_ms: 1_000 },
    )
}

#[test]
fn evaluate_runs_the_full_pipeline() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("rendered");
    let harness = harness(dir.path(), &marker);

    let evaluation = harness.evaluate(&program("OK")).expect("evaluate");
    assert_eq!(evaluation.outcome, Outcome::Ok);
    assert!(evaluation.exit_status.is_some());
    assert!(evaluation.detail().is_none());
    assert!(marker.exists());
}

#[test]
fn invalid_program_never_reaches_the_renderer() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("rendered");
    let harness = harness(dir.path(), &marker);

    let evaluation = harness
        .evaluate(&ProgramInput::raw("void mainImage(out vec4 c, in vec2 p) {\n    c = vec4(1.0);\n"))
        .expect("evaluate");
    assert_eq!(evaluation.outcome, Outcome::Error);
    assert!(evaluation.exit_status.is_none());
    assert!(evaluation.detail().expect("detail").starts_with("syntax:"));
    assert!(!marker.exists(), "renderer must not be invoked for invalid programs");
}

#[test]
fn batch_results_keep_input_order() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("rendered");
    let harness = harness(dir.path(), &marker);

    let inputs = vec![
        program("CRASH"),
        program("OK"),
        program("HANG"),
        program("NOISY"),
        program("PARTIAL"),
        ProgramInput::raw("void main() {"),
    ];
    let outcomes: Vec<Outcome> = harness
        .evaluate_batch(&inputs, 3)
        .into_iter()
        .map(|r| r.expect("evaluation").outcome)
        .collect();

    assert_eq!(
        outcomes,
        [
            Outcome::Crash,
            Outcome::Ok,
            Outcome::Timeout,
            Outcome::Error,
            Outcome::Incomplete,
            Outcome::Error,
        ]
    );
}

#[test]
fn crash_does_not_affect_the_next_program() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("rendered");
    let harness = harness(dir.path(), &marker);

    let results = harness.evaluate_batch(&[program("CRASH"), program("OK")], 1);
    assert_eq!(results[0].as_ref().expect("first").outcome, Outcome::Crash);
    assert_eq!(results[1].as_ref().expect("second").outcome, Outcome::Ok);
}

#[test]
fn empty_batch_is_empty() {
    let dir = tempdir().expect("tempdir");
    let marker = dir.path().join("rendered");
    assert!(harness(dir.path(), &marker).evaluate_batch(&[], 4).is_empty());
}
