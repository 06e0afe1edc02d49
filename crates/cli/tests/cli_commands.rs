use std::fs;

use predicates::prelude::*;
use tempfile::tempdir;

const SHADER: &str = "\
// Tint a color.
vec3 tint(vec3 c) {
    // halves every channel
    return c * 0.5;
}

void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    fragColor = vec4(tint(vec3(1.0)), 1.0);
}
";

#[test]
fn no_subcommand_prints_usage_and_fails() {
    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn functions_lists_offsets_and_signatures() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tint.frag");
    fs::write(&path, SHADER).expect("write shader");

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("functions")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("vec3 tint(vec3 c)"))
        .stdout(predicate::str::contains("void mainImage(out vec4 fragColor, in vec2 fragCoord)"));
}

#[test]
fn functions_json_reports_five_tuples_and_header() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tint.frag");
    fs::write(&path, SHADER).expect("write shader");

    let output = assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .args(["functions", "--json", "--header"])
        .arg(&path)
        .output()
        .expect("run functions");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    let functions = value["functions"].as_array().expect("functions");
    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0][0], 0);
    assert_eq!(functions[0].as_array().map(Vec::len), Some(5));
    assert_eq!(value["header_comment"][0], 0);
}

#[test]
fn functions_reads_json_program_records() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("record.json");
    fs::write(&path, serde_json::json!({"id": "x", "image_code": "void main() {}"}).to_string())
        .expect("write record");

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("functions")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("void main()"));
}

#[test]
fn functions_fails_for_missing_file() {
    let dir = tempdir().expect("tempdir");
    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("functions")
        .arg(dir.path().join("missing.frag"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read program"));
}

#[test]
fn validate_reports_syntax_errors() {
    let dir = tempdir().expect("tempdir");
    let good = dir.path().join("good.frag");
    let bad = dir.path().join("bad.frag");
    fs::write(&good, SHADER).expect("write good");
    fs::write(&bad, "void main() {\n").expect("write bad");

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("validate")
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::diff("valid\n"));

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("validate")
        .arg(&bad)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("invalid (syntax)"));
}

#[test]
fn init_config_writes_defaults_once() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("conf").join("curator.yaml");

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("init-config")
        .arg("--path")
        .arg(&path)
        .assert()
        .success();
    let text = fs::read_to_string(&path).expect("config written");
    assert!(text.contains("execute_ms: 10000"), "{text}");

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("init-config")
        .arg("--path")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .args(["init-config", "--force", "--path"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn annotate_rejects_unknown_columns() {
    let dir = tempdir().expect("tempdir");
    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("annotate")
        .arg("--input")
        .arg(dir.path())
        .arg("--output")
        .arg(dir.path())
        .args(["--columns", "license"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown column 'license'"));
}

#[test]
fn annotate_redo_writes_function_columns() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("raw");
    let output = dir.path().join("annotated");
    fs::create_dir_all(&input).expect("mkdir");
    fs::write(
        input.join("api.jsonl"),
        format!("{}\n", serde_json::json!({"id": "t", "image_code": SHADER})),
    )
    .expect("write jsonl");

    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("annotate")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .args(["--mode", "redo", "--columns", "functions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Annotated 1 file(s), 1 record(s)"));

    let text = fs::read_to_string(output.join("api.jsonl")).expect("annotated file");
    let record: serde_json::Value = serde_json::from_str(text.trim()).expect("record");
    assert_eq!(record["functions"].as_array().map(Vec::len), Some(2));
    assert_eq!(record["id"], "t");
}

#[test]
fn outcomes_requires_a_ledger() {
    assert_cmd::cargo::cargo_bin_cmd!("shader-curator")
        .arg("outcomes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No outcome ledger configured"));
}
