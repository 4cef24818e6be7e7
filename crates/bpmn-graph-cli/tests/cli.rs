//! End-to-end tests for the bpmn-graph binary

use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::tempdir;

const BIN: &str = env!("CARGO_BIN_EXE_bpmn-graph");

const DOCUMENT: &str = r#"{
    "process": { "id": "Process_1" },
    "elements": [
        { "type": "bpmn:StartEvent", "data": { "id": "Start" } },
        { "type": "bpmn:UserTask", "data": { "id": "Review" } },
        { "type": "bpmn:EndEvent", "data": { "id": "End" } },
        { "type": "bpmn:SequenceFlow", "data": { "id": "f1", "sourceRef": "Start", "targetRef": "Review" } },
        { "type": "bpmn:SequenceFlow", "data": { "id": "f2", "sourceRef": "Review", "targetRef": "End" } }
    ]
}"#;

fn run(args: &[&str], stdin: Option<&str>) -> (bool, String, String) {
    let mut child = Command::new(BIN)
        .args(args)
        .env_remove("BPMN_GRAPH_LOG_LEVEL")
        .env_remove("BPMN_GRAPH_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn bpmn-graph");
    if let Some(input) = stdin {
        // The binary may exit (e.g. on argument validation) before consuming
        // stdin; a broken pipe here is not a test failure.
        if let Err(err) = child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(input.as_bytes())
        {
            assert_eq!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe,
                "failed to write stdin: {err}"
            );
        }
    } else {
        drop(child.stdin.take());
    }
    let output = child.wait_with_output().expect("failed to wait for bpmn-graph");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn ids(records: &Value) -> Vec<&str> {
    records
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["id"].as_str().unwrap())
        .collect()
}

#[test]
fn test_fronts_from_stdin() {
    let (ok, stdout, stderr) = run(&["fronts", "-i", "-", "--id", "End"], Some(DOCUMENT));
    assert!(ok, "stderr: {}", stderr);
    let fronts: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(ids(&fronts), vec!["f2", "Review", "f1", "Start"]);
}

#[test]
fn test_fronts_filtered_by_kind() {
    let (ok, stdout, _) = run(
        &["fronts", "--id", "End", "--bpmn", "StartEvent"],
        Some(DOCUMENT),
    );
    assert!(ok);
    let fronts: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(ids(&fronts), vec!["Start"]);
}

#[test]
fn test_front_and_root_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diagram.json");
    fs::write(&path, DOCUMENT).unwrap();
    let path = path.to_str().unwrap();

    let (ok, stdout, _) = run(&["front", "-i", path, "--id", "End"], None);
    assert!(ok);
    let front: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(front["id"], "Review");
    assert_eq!(front["groupName"], "task");

    let (ok, stdout, _) = run(&["root", "-i", path], None);
    assert!(ok);
    let root: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(root, json!({ "id": "Process_1", "extensions": [] }));
}

#[test]
fn test_elements_lists_every_record() {
    let (ok, stdout, _) = run(&["elements"], Some(DOCUMENT));
    assert!(ok);
    let records: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(ids(&records), vec!["Start", "Review", "End", "f1", "f2"]);
}

#[test]
fn test_unknown_selection_fails() {
    let (ok, _, stderr) = run(&["fronts", "--id", "Ghost"], Some(DOCUMENT));
    assert!(!ok);
    assert!(stderr.contains("Error"));
}

#[test]
fn test_update_writes_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("diagram.json");
    let output = dir.path().join("updated.json");
    fs::write(&input, DOCUMENT).unwrap();

    let (ok, _, stderr) = run(
        &[
            "update",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--process",
            "--patch",
            r#"{ "extensions": [ { "name": "P1", "owner": "ops" } ] }"#,
        ],
        None,
    );
    assert!(ok, "stderr: {}", stderr);

    let (ok, stdout, _) = run(&["root", "-i", output.to_str().unwrap()], None);
    assert!(ok);
    let root: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(root["extensions"], json!([{ "name": "P1", "owner": "ops" }]));
}

#[test]
fn test_readonly_config_blocks_updates() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("designer.json");
    fs::write(&config, r#"{ "readonly": true }"#).unwrap();

    let (ok, _, stderr) = run(
        &[
            "update",
            "--config",
            config.to_str().unwrap(),
            "--id",
            "Review",
            "--patch",
            r#"{ "original": { "name": "X" } }"#,
        ],
        Some(DOCUMENT),
    );
    assert!(!ok);
    assert!(stderr.contains("read-only"));
}

#[test]
fn test_clone_prints_new_element() {
    let (ok, stdout, _) = run(&["clone", "--id", "Review"], Some(DOCUMENT));
    assert!(ok);
    let clone: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(clone["type"], "bpmn:UserTask");
    assert_ne!(clone["data"]["id"], "Review");
}

#[test]
fn test_scale_and_restore() {
    let (ok, stdout, _) = run(
        &["scale", "--factor", "2"],
        Some(r#"{ "x": 10, "points": [ { "x": 1.5 } ], "label": "a" }"#),
    );
    assert!(ok);
    let scaled: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(scaled, json!({ "x": 20, "points": [ { "x": 3 } ], "label": "a" }));

    let (ok, stdout, _) = run(&["scale", "--factor", "2", "--restore"], Some(&stdout));
    assert!(ok);
    let restored: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(restored, json!({ "x": 10, "points": [ { "x": 1.5 } ], "label": "a" }));
}

#[test]
fn test_zero_scale_is_rejected() {
    let (ok, _, _) = run(&["scale", "--factor", "0"], Some("{}"));
    assert!(!ok);
}
