#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use predicates::prelude::*;
use tempfile::tempdir;

const OK_SHADER: &str = "void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }\n";
const CRASH_SHADER: &str = "// CRASH\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(0.0); }\n";

/// Config pointing at a fake renderer that crashes on programs mentioning CRASH.
fn write_config(dir: &Path) -> PathBuf {
    let script = dir.join("render.sh");
    fs::write(
        &script,
        "#!/bin/sh\nfor arg in \"$@\"; do last=\"$arg\"; done\nif grep -q CRASH \"$last\"; then kill -SEGV $$; fi\nexit 0\n",
    )
    .expect("write renderer");

    let config = dir.join("curator.json");
    let body = serde_json::json!({
        "renderer": { "program": "sh", "args": [script.display().to_string()] },
        "deadlines": { "validate_ms": 2000, "execute_ms": 2000 },
        "ledger": dir.join("ledger.db"),
    });
    fs::write(&config, body.to_string()).expect("write config");
    config
}

#[test]
fn run_classifies_and_records_outcomes() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let ok = dir.path().join("ok.frag");
    let crash = dir.path().join("crash.frag");
    let broken = dir.path().join("broken.frag");
    fs::write(&ok, OK_SHADER).expect("write");
    fs::write(&crash, CRASH_SHADER).expect("write");
    fs::write(&broken, "void mainImage(out vec4 c, in vec2 p) {\n").expect("write");

    let output = assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("run")
        .arg("--config")
        .arg(&config)
        .args(["--jobs", "2", "--json"])
        .arg(&ok)
        .arg(&crash)
        .arg(&broken)
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json rows");
    let outcomes: Vec<&str> =
        rows.as_array().expect("rows").iter().map(|r| r["outcome"].as_str().unwrap_or("")).collect();
    assert_eq!(outcomes, ["ok", "panic", "error"]);

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("outcomes")
        .arg("--config")
        .arg(&config)
        .arg("--counts")
        .assert()
        .success()
        .stdout(predicate::str::contains("panic"))
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn second_run_reuses_recorded_outcomes() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let ok = dir.path().join("ok.frag");
    fs::write(&ok, OK_SHADER).expect("write");

    for expect_recorded in [false, true] {
        let assert = assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
            .arg("run")
            .arg("--config")
            .arg(&config)
            .arg(&ok)
            .assert()
            .success()
            .stdout(predicate::str::contains("\tok\t"));
        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
        assert_eq!(stdout.contains("(recorded)"), expect_recorded, "{stdout}");
    }
}

#[test]
fn renderer_override_applies_over_config() {
    let dir = tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let ok = dir.path().join("ok.frag");
    fs::write(&ok, OK_SHADER).expect("write");

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("run")
        .arg("--config")
        .arg(&config)
        .args(["--renderer", "/nonexistent/renderer"])
        .arg(&ok)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to evaluate"));
}
