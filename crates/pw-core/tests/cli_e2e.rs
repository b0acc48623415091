//! CLI E2E tests for the `pyrowatch` binary.
//!
//! Validates:
//! - `replay` plays a document to the end and exits 1 when the alert fires
//! - `--with-reports` fetches the report for the alert frame itself
//! - rejected speeds, bad configs and bad documents map to their exit codes
//! - `inspect` and `classify` output in both formats

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use pw_core::replay::scenarios::uniform_series;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

// ============================================================================
// Helpers
// ============================================================================

fn pyrowatch() -> Command {
    let mut cmd = cargo_bin_cmd!("pyrowatch");
    cmd.timeout(Duration::from_secs(60));
    cmd
}

/// 5 ms ticks at the default 4x speed.
fn fast_config(dir: &Path) -> PathBuf {
    let path = dir.join("engine.toml");
    fs::write(
        &path,
        "[playback]\nbase_interval_ms = 20\nallowed_speeds = [1, 4]\ndefault_speed = 4\n",
    )
    .expect("write config");
    path
}

fn series_file(dir: &Path, len: usize, alert: Option<usize>) -> PathBuf {
    let path = dir.join(format!("uniform_{len}.json"));
    let series = uniform_series(len, alert).expect("valid series");
    fs::write(&path, series.to_json_pretty().expect("serialize")).expect("write series");
    path
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("one JSON object per line"))
        .collect()
}

struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("tempdir");
    let config = fast_config(dir.path());
    Fixture { dir, config }
}

// ============================================================================
// replay
// ============================================================================

#[test]
fn test_replay_with_alert_exits_1() {
    let fx = fixture();
    let file = series_file(fx.dir.path(), 5, Some(3));

    let output = pyrowatch()
        .args(["--format", "json", "replay", "--with-reports"])
        .arg("--config")
        .arg(&fx.config)
        .arg("--file")
        .arg(&file)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let events = json_lines(&output);
    let fired: Vec<&Value> = events
        .iter()
        .filter(|e| e["event"] == "alert_fired")
        .collect();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0]["index"], 3);

    let frames = events.iter().filter(|e| e["event"] == "frame_changed").count();
    assert_eq!(frames, 4);
    assert!(events
        .iter()
        .any(|e| e["event"] == "playback_stopped" && e["reason"] == "end_of_series"));

    let reports: Vec<&Value> = events.iter().filter(|e| e["event"] == "report").collect();
    let indices: Vec<&Value> = reports.iter().map(|r| &r["report"]["frame_index"]).collect();
    assert_eq!(indices, vec![&Value::from(3), &Value::from(4)]);
    for report in reports {
        assert_eq!(report["report"]["status"], "ready");
    }
}

#[test]
fn test_replay_without_alert_exits_0() {
    let fx = fixture();
    let file = series_file(fx.dir.path(), 6, None);

    pyrowatch()
        .arg("replay")
        .arg("--config")
        .arg(&fx.config)
        .arg("--file")
        .arg(&file)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("6 frames, no alert"))
        .stdout(predicate::str::contains("[  5/5]"));
}

#[test]
fn test_replay_scenario_by_name() {
    let fx = fixture();
    pyrowatch()
        .args(["--format", "json", "replay", "--scenario", "calm_week"])
        .arg("--config")
        .arg(&fx.config)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"series_id\":\"calm_week\""));
}

#[test]
fn test_replay_rejected_speed_exits_12() {
    let fx = fixture();
    let file = series_file(fx.dir.path(), 5, None);

    let output = pyrowatch()
        .args(["--format", "json", "replay", "--speed", "12"])
        .arg("--config")
        .arg(&fx.config)
        .arg("--file")
        .arg(&file)
        .assert()
        .code(12)
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(json["command"], "replay");
    assert_eq!(json["error"]["code"], 20);
    assert_eq!(json["exit_code"], 12);
    assert_eq!(json["error"]["retryable"], false);
}

#[test]
fn test_replay_unknown_scenario_exits_11() {
    let fx = fixture();
    pyrowatch()
        .args(["replay", "--scenario", "no_such_fire"])
        .arg("--config")
        .arg(&fx.config)
        .assert()
        .code(11)
        .stderr(predicate::str::contains("no_such_fire"));
}

// ============================================================================
// Config errors
// ============================================================================

#[test]
fn test_invalid_config_exits_10() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("engine.toml");
    fs::write(&config, "[playback]\nallowed_speeds = []\n").expect("write config");

    pyrowatch()
        .args(["--format", "json", "scenarios"])
        .arg("--config")
        .arg(&config)
        .assert()
        .code(10)
        .stdout(predicate::str::contains("\"exit_code\": 10"));
}

#[test]
fn test_sub_millisecond_tick_config_exits_10() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("engine.toml");
    fs::write(
        &config,
        "[playback]\nbase_interval_ms = 1\nallowed_speeds = [1, 2000000]\ndefault_speed = 1\n",
    )
    .expect("write config");

    pyrowatch()
        .args(["replay", "--scenario", "calm_week"])
        .arg("--config")
        .arg(&config)
        .assert()
        .code(10)
        .stderr(predicate::str::contains("playback.allowed_speeds"));
}

// ============================================================================
// inspect
// ============================================================================

#[test]
fn test_inspect_json_summary() {
    let fx = fixture();
    let file = series_file(fx.dir.path(), 5, Some(3));

    let output = pyrowatch()
        .args(["--format", "json", "inspect"])
        .arg(&file)
        .arg("--config")
        .arg(&fx.config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(json["command"], "inspect");
    assert!(json.get("schema_version").is_some());
    assert_eq!(json["series"]["frames"], 5);
    assert_eq!(json["series"]["alert_frame"], 3);
}

#[test]
fn test_inspect_human() {
    let fx = fixture();
    let file = series_file(fx.dir.path(), 5, None);

    pyrowatch()
        .arg("inspect")
        .arg(&file)
        .arg("--config")
        .arg(&fx.config)
        .assert()
        .success()
        .stdout(predicate::str::contains("frames:      5"))
        .stdout(predicate::str::contains("alert frame: none"));
}

#[test]
fn test_inspect_invalid_document_exits_11() {
    let fx = fixture();
    let file = fx.dir.path().join("empty.json");
    fs::write(&file, r#"{"fire_id": "empty", "frames": []}"#).expect("write");

    pyrowatch()
        .arg("inspect")
        .arg(&file)
        .arg("--config")
        .arg(&fx.config)
        .assert()
        .code(11);
}

#[test]
fn test_inspect_missing_file_exits_13() {
    let fx = fixture();
    pyrowatch()
        .arg("inspect")
        .arg(fx.dir.path().join("missing.json"))
        .arg("--config")
        .arg(&fx.config)
        .assert()
        .code(13);
}

// ============================================================================
// classify
// ============================================================================

#[test]
fn test_classify_json() {
    let fx = fixture();
    let output = pyrowatch()
        .args(["--format", "json", "classify", "WARNING"])
        .arg("--config")
        .arg(&fx.config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(json["command"], "classify");
    assert_eq!(json["label"], "WARNING");
    assert_eq!(json["tier"]["key"], "warning");
}
