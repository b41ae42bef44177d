//! Integration tests for `shopai config` and `shopai status`.

mod common;

use predicates::prelude::*;
use serde_json::Value;

use common::{shopai_cmd, Sandbox};

#[test]
fn test_config_check_valid() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_check_reports_parse_errors() {
    let sandbox = Sandbox::with_config("pipeline: [unclosed\n");
    let output = sandbox
        .cmd()
        .args(["config", "check", "--json"])
        .output()
        .expect("run shopai");
    assert!(!output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["exists"], true);
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"].as_array().unwrap().len(), 1);
}

#[test]
fn test_config_check_reports_invalid_values() {
    let sandbox = Sandbox::with_config("pipeline:\n  neighborK: 0\n");
    sandbox
        .cmd()
        .args(["config", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("neighborK"))
        .stderr(predicate::str::contains("configuration error(s) found"));
}

#[test]
fn test_config_check_without_file_uses_defaults() {
    let home = tempfile::TempDir::new().unwrap();
    shopai_cmd(home.path())
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found, using defaults"));
}

#[test]
fn test_config_show_resolves_relative_paths() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["--device", "cpu", "config", "show", "--json"])
        .output()
        .expect("run shopai");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["device"], "cpu");
    let index_dir = json["data"]["indexDir"].as_str().unwrap();
    assert!(std::path::Path::new(index_dir).is_absolute());
    assert!(index_dir.ends_with("index"));
    assert_eq!(json["pipeline"]["neighborK"], 20);
}

#[test]
fn test_status_reports_missing_index() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["status", "--json"])
        .output()
        .expect("run shopai");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["catalog"]["loaded"], true);
    assert_eq!(json["catalog"]["count"], 30);
    assert_eq!(json["index"]["exists"], false);
    assert_eq!(json["embedding"]["available"], false);
}

#[test]
fn test_status_human_output_lists_problems() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPONENT"))
        .stdout(predicate::str::contains("shopai build-index"))
        .stdout(predicate::str::contains("Not ready to recommend"));
}

#[test]
fn test_status_works_when_catalog_is_missing() {
    let sandbox = Sandbox::with_config("data:\n  catalogPath: missing.json\n");
    let output = sandbox
        .cmd()
        .args(["status", "--json"])
        .output()
        .expect("run shopai");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["catalog"]["loaded"], false);
}
