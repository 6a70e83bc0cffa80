//! Integration tests for the `slots` CLI binary.
//!
//! These use `assert_cmd` and `predicates` to run the starts, ends, schedule
//! and validate subcommands through the actual binary, reading snapshots from
//! fixture files and from stdin.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to the downtown.json fixture.
fn downtown_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/downtown.json")
}

/// Helper: path to the inverted.json fixture.
fn inverted_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/inverted.json")
}

/// Helper: run a subcommand and parse its stdout as JSON.
fn run_json(args: &[&str]) -> serde_json::Value {
    let output = Command::cargo_bin("slots")
        .unwrap()
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

fn eligible(value: &serde_json::Value) -> Vec<String> {
    value["slots"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["eligible"] == true)
        .map(|s| s["slot"].as_str().unwrap().to_string())
        .collect()
}

const NOW: &str = "2026-03-01T09:00:00Z";

// ─────────────────────────────────────────────────────────────────────────────
// starts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn starts_from_file() {
    let out = run_json(&[
        "starts", "-l", downtown_path(), "--date", "2026-03-16", "--party-size", "2", "--now", NOW,
    ]);

    assert_eq!(
        eligible(&out),
        vec!["18:00", "19:30", "20:00", "20:30", "21:00", "21:30"]
    );
    assert!(out.get("reason").is_none());
}

#[test]
fn starts_from_stdin() {
    let snapshot = std::fs::read_to_string(downtown_path()).unwrap();

    Command::cargo_bin("slots")
        .unwrap()
        .args(["starts", "--date", "2026-03-17", "--now", NOW])
        .write_stdin(snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"BLOCKED\""));
}

#[test]
fn starts_while_editing_reenables_own_slot() {
    let out = run_json(&[
        "starts", "-l", downtown_path(), "--date", "2026-03-16", "--editing", "r1", "--now", NOW,
    ]);

    assert!(eligible(&out).contains(&"19:00".to_string()));
    assert!(eligible(&out).contains(&"18:30".to_string()));
}

#[test]
fn starts_on_closed_day_reports_reason() {
    let out = run_json(&["starts", "-l", downtown_path(), "--date", "2026-12-25", "--now", NOW]);

    assert_eq!(out["reason"], "CLOSED");
    assert!(out["slots"].as_array().unwrap().is_empty());
}

#[test]
fn starts_in_the_past_reports_no_future_slots() {
    let out = run_json(&[
        "starts", "-l", downtown_path(), "--date", "2026-03-16", "--now", "2026-03-17T00:00:00Z",
    ]);
    assert_eq!(out["reason"], "NO_FUTURE_SLOTS");
}

#[test]
fn starts_writes_output_file() {
    let output_path = std::env::temp_dir().join("slots-test-starts-output.json");
    let _ = std::fs::remove_file(&output_path);

    Command::cargo_bin("slots")
        .unwrap()
        .args(["starts", "-l", downtown_path(), "--date", "2026-03-16", "--now", NOW, "-o"])
        .arg(&output_path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["date"], "2026-03-16");

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn unknown_editing_id_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["starts", "-l", downtown_path(), "--date", "2026-03-16", "--editing", "nope", "--now", NOW])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in snapshot"));
}

#[test]
fn lookback_requires_editing() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["starts", "-l", downtown_path(), "--date", "2026-03-16", "--lookback-hours", "1"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// ends
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn ends_stop_before_next_booking() {
    let out = run_json(&[
        "ends", "-l", downtown_path(), "--date", "2026-03-16", "--start", "18:00", "--now", NOW,
    ]);

    assert_eq!(out["start"], "18:00");
    assert_eq!(eligible(&out), vec!["18:30"]);
}

#[test]
fn ends_reject_malformed_start() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["ends", "-l", downtown_path(), "--date", "2026-03-16", "--start", "7pm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid time slot"));
}

#[test]
fn ends_reject_closing_as_start() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["ends", "-l", downtown_path(), "--date", "2026-03-16", "--start", "22:00", "--now", NOW])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a start slot"));
}

// ─────────────────────────────────────────────────────────────────────────────
// schedule / validate
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn schedule_shows_weekly_hours() {
    // 2026-03-20 is a Friday (Monday-first index 4).
    let out = run_json(&["schedule", "-l", downtown_path(), "--date", "2026-03-20"]);
    assert_eq!(out["opening"], "18:00");
    assert_eq!(out["closing"], "23:00");
    assert_eq!(out["is_open"], true);
}

#[test]
fn schedule_shows_special_date_closure() {
    let out = run_json(&["schedule", "-l", downtown_path(), "--date", "2026-12-25"]);
    assert_eq!(out["is_open"], false);
}

#[test]
fn validate_accepts_good_snapshot() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["validate", "-l", downtown_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Location downtown is valid"));
}

#[test]
fn validate_rejects_inverted_hours() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["validate", "-l", inverted_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn validate_rejects_hours_off_the_grid() {
    let snapshot = std::fs::read_to_string(downtown_path())
        .unwrap()
        .replace(r#""closing": "23:00""#, r#""closing": "22:45""#);

    Command::cargo_bin("slots")
        .unwrap()
        .arg("validate")
        .write_stdin(snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("22:45 is not on the 30-minute grid"));
}

#[test]
fn missing_file_fails_with_context() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["validate", "-l", "/nonexistent/location.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}
