use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn jsontools() -> Command {
    let mut cmd = Command::cargo_bin("jsontools").expect("binary");
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn query_prints_matches_as_json() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("doc.json");
    fs::write(&file, r#"{"a":[1,2,3]}"#).unwrap();

    let output = jsontools()
        .arg("query")
        .arg(&file)
        .arg("$.a[*]")
        .output()
        .expect("command run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body, json!([1, 2, 3]));
}

#[test]
fn nodes_honours_count() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("rows.ndjson");
    fs::write(&file, "{\"id\":1}\n{\"id\":2}\n").unwrap();

    let output = jsontools()
        .args(["nodes", "--count", "1"])
        .arg(&file)
        .arg("$[*].id")
        .output()
        .expect("command run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body, json!([{"path": ["$", 0, "id"], "value": 1}]));
}

#[test]
fn eval_updates_file_from_code_file() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("counter.json");
    let script = temp.path().join("bump.rhai");
    fs::write(&file, r#"{"n":1}"#).unwrap();
    fs::write(&script, r#"data.n += 1; #{ "type": "updateFile", "data": data }"#).unwrap();

    jsontools()
        .arg("eval")
        .arg(&file)
        .arg("--code-file")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Successfully updated single file:"));

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"n": 2}));
}

#[test]
fn eval_reads_script_from_stdin() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("doc.json");
    fs::write(&file, r#"{"name":"jsontools"}"#).unwrap();

    jsontools()
        .arg("eval")
        .arg(&file)
        .args(["--code-file", "-"])
        .write_stdin("data.name")
        .assert()
        .success()
        .stdout("jsontools\n");
}

#[test]
fn multi_eval_rejects_bad_index_and_exits_non_zero() {
    let temp = tempdir().unwrap();
    let a = temp.path().join("a.json");
    let b = temp.path().join("b.json");
    fs::write(&a, r#"{"a":1}"#).unwrap();
    fs::write(&b, r#"{"b":1}"#).unwrap();

    jsontools()
        .arg("multi-eval")
        .arg(&a)
        .arg(&b)
        .arg("--code")
        .arg(r#"#{ "type": "updateMultipleFiles", "updates": [#{ "index": 2, "data": 0 }] }"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: invalid_mutation_directive"));

    assert_eq!(fs::read_to_string(&a).unwrap(), r#"{"a":1}"#);
}

#[test]
fn timeout_flag_bounds_runaway_scripts() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("doc.json");
    fs::write(&file, "{}").unwrap();

    jsontools()
        .args(["--timeout-ms", "200", "eval"])
        .arg(&file)
        .args(["--code", "let i = 0; loop { i += 1; }"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: timeout_exceeded"));
}

#[test]
fn missing_script_is_a_usage_error() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("doc.json");
    fs::write(&file, "{}").unwrap();

    jsontools()
        .arg("eval")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No script given"));
}
