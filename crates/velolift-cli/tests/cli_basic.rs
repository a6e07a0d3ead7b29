//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a scratch directory so
//! the user's real config is never touched.

use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &std::path::Path, args: &[&str], stdin: Option<&str>) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_velolift-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("VELOLIFT_ENV")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    if let Some(input) = stdin {
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
    } else {
        drop(child.stdin.take());
    }
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json_lines(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSON line"))
        .collect()
}

fn types(events: &[Value]) -> Vec<&str> {
    events.iter().filter_map(|e| e["type"].as_str()).collect()
}

#[test]
fn test_replay_deadlift_from_stdin() {
    let home = tempfile::tempdir().unwrap();
    let mut input = String::from("# one deadlift rep\n");
    for _ in 0..10 {
        input.push_str("0.5\n");
    }
    for _ in 0..10 {
        input.push_str("-0.4\n");
    }
    for _ in 0..5 {
        input.push_str("0.0\n");
    }

    let (stdout, stderr, code) = run_cli(home.path(), &["replay", "-"], Some(&input));
    assert_eq!(code, 0, "replay failed: {stderr}");

    let events = json_lines(&stdout);
    assert_eq!(types(&events), vec!["rep_completed", "summary"]);
    assert_eq!(events[0]["rep"]["rep_number"], 1);
    assert_eq!(events[1]["summary"]["total_reps"], 1);
}

#[test]
fn test_replay_with_frames() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["replay", "-", "--frames"], Some("0.0\n0.0\n"));
    assert_eq!(code, 0);
    let events = json_lines(&stdout);
    assert_eq!(types(&events), vec!["frame", "frame", "summary"]);
    assert_eq!(events[0]["state"], "resting");
}

#[test]
fn test_replay_rejects_bad_sample() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["replay", "-"], Some("0.1\nfast\n"));
    assert_ne!(code, 0);
    assert!(stderr.contains("line 2"), "stderr: {stderr}");
}

#[test]
fn test_replay_missing_file() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["replay", "/nonexistent/samples.txt"], None);
    assert_ne!(code, 0);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_simulate_counts_reps() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(
        home.path(),
        &["simulate", "--pattern", "deadlift", "--reps", "4", "--seed", "3"],
        None,
    );
    assert_eq!(code, 0, "simulate failed: {stderr}");
    let events = json_lines(&stdout);
    let reps = types(&events)
        .iter()
        .filter(|t| **t == "rep_completed")
        .count();
    assert_eq!(reps, 4);
    assert_eq!(events.last().unwrap()["summary"]["total_reps"], 4);
}

#[test]
fn test_simulate_flags_fatigue() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &[
            "simulate", "--pattern", "deadlift", "--reps", "8", "--loss", "0.06", "--noise",
            "0.002", "--seed", "1",
        ],
        None,
    );
    assert_eq!(code, 0);
    let events = json_lines(&stdout);
    let warning = events
        .iter()
        .find(|e| e["type"] == "fatigue_warning")
        .expect("fatigue warning");
    assert_eq!(warning["warning"]["rep_number"], 5);
}

#[test]
fn test_simulate_rejects_unknown_pattern() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["simulate", "--pattern", "curl"], None);
    assert_ne!(code, 0);
}

#[test]
fn test_simulate_rejects_non_finite_noise() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(home.path(), &["simulate", "--noise", "inf"], None);
    assert_eq!(code, 1, "stderr: {stderr}");
    assert!(stderr.starts_with("error:"), "stderr: {stderr}");
    assert!(stderr.contains("noise"));
    assert!(stdout.is_empty());
}

#[test]
fn test_live_runs_to_completion() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(
        home.path(),
        &["live", "--reps", "1", "--sample-ms", "2", "--max-secs", "30"],
        None,
    );
    assert_eq!(code, 0, "live failed: {stderr}");
    let events = json_lines(&stdout);
    assert_eq!(events.last().unwrap()["type"], "summary");
}

#[test]
fn test_config_get_set_roundtrip() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "tracker.min_phase_ms"], None);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "150");

    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "tracker.min_phase_ms", "200"], None);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "tracker.min_phase_ms"], None);
    assert_eq!(stdout.trim(), "200");
    assert!(home.path().join(".config/velolift/config.toml").exists());
}

#[test]
fn test_config_rejects_unknown_key_and_bad_value() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "tracker.nope"], None);
    assert_ne!(code, 0);
    assert!(stderr.contains("tracker.nope"));

    let (_, _, code) = run_cli(home.path(), &["config", "set", "fatigue.threshold", "0"], None);
    assert_ne!(code, 0);
}

#[test]
fn test_config_list_and_reset() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["config", "set", "stream.dedupe", "true"], None);

    let (stdout, _, code) = run_cli(home.path(), &["config", "list"], None);
    assert_eq!(code, 0);
    assert!(stdout.contains("stream.dedupe = true"));

    let (_, _, code) = run_cli(home.path(), &["config", "reset"], None);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "list", "--json"], None);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["stream"]["dedupe"], false);
}
