use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn fixture(name: &str) -> PathBuf {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn gaopt() -> Command {
    Command::new(assert_cmd::cargo_bin!("gaopt"))
}

#[test]
fn generate_is_reproducible_with_a_seed() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let first = tmp.path().join("first.json");
    let second = tmp.path().join("second.json");
    for out in [&first, &second] {
        gaopt()
            .args(["generate", "--seed", "17", "-o", out.to_string_lossy().as_ref()])
            .assert()
            .success();
    }
    let a = fs::read_to_string(&first).expect("read first");
    let b = fs::read_to_string(&second).expect("read second");
    assert_eq!(a, b);

    let value: serde_json::Value = serde_json::from_str(&a).expect("valid json");
    assert_eq!(value["nodes"].as_array().map(Vec::len), Some(10));
}

#[test]
fn metrics_prints_a_summary() {
    let output = gaopt()
        .args(["metrics", "-i", fixture("bowtie.json").to_string_lossy().as_ref()])
        .output()
        .expect("run gaopt");
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json summary");
    assert_eq!(summary["nodes"], 4);
    assert_eq!(summary["edges"], 4);
    assert_eq!(summary["metrics"]["edgeCrossing"], 1.0);
}

#[test]
fn optimize_writes_graph_and_report() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.json");
    let report = tmp.path().join("report.json");
    gaopt()
        .args([
            "optimize",
            "-i",
            fixture("huddle.json").to_string_lossy().as_ref(),
            "-o",
            out.to_string_lossy().as_ref(),
            "--report",
            report.to_string_lossy().as_ref(),
            "--iterations",
            "5",
        ])
        .assert()
        .success();

    let graph: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read graph")).expect("json graph");
    assert_eq!(graph["nodes"].as_array().map(Vec::len), Some(8));
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("read report")).expect("json report");
    assert_eq!(report["run"]["algorithm"], "hillClimbing");
    assert!(report["after"]["objective"].is_number());
}

#[test]
fn config_file_selects_the_layout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("config.json5");
    fs::write(&config, "{ layout: { algorithm: 'circular', circular: { maxIterations: 10 } } }")
        .expect("write config");
    let report = tmp.path().join("report.json");
    gaopt()
        .args([
            "-c",
            config.to_string_lossy().as_ref(),
            "optimize",
            "-i",
            fixture("zigzag_path.json").to_string_lossy().as_ref(),
            "-o",
            tmp.path().join("out.json").to_string_lossy().as_ref(),
            "--report",
            report.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("read report")).expect("json report");
    assert_eq!(report["run"]["algorithm"], "circular");
    assert_eq!(report["run"]["iterations"], 10);
}

#[test]
fn tabu_layout_is_an_error() {
    gaopt()
        .args([
            "optimize",
            "-i",
            fixture("bowtie.json").to_string_lossy().as_ref(),
            "--layout",
            "tabu",
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unknown_config_keys_are_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{ "weights": { "edgeLength": 1 }, "colour": "red" }"#)
        .expect("write config");
    gaopt()
        .args([
            "-c",
            config.to_string_lossy().as_ref(),
            "metrics",
            "-i",
            fixture("bowtie.json").to_string_lossy().as_ref(),
        ])
        .assert()
        .failure();
}

#[test]
fn batch_prints_a_table_and_json() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let json = tmp.path().join("rows.json");
    let output = gaopt()
        .args([
            "batch",
            fixture("bowtie.json").to_string_lossy().as_ref(),
            fixture("lopsided_star.json").to_string_lossy().as_ref(),
            "--iterations",
            "3",
            "--json",
            json.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run gaopt");
    assert!(output.status.success());
    let table = String::from_utf8_lossy(&output.stdout);
    assert!(table.starts_with("status"));
    assert!(table.contains("bowtie.json"));
    assert!(table.contains("lopsided_star.json"));

    let rows: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json).expect("read rows")).expect("json rows");
    assert_eq!(rows.as_array().map(Vec::len), Some(2));
    assert_eq!(rows[0]["status"], "done");
}
