mod common;

use common::{fixture_path, run_cli};
use serde_json::Value;

fn fixture(name: &str) -> String {
    fixture_path(name).to_string_lossy().into_owned()
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

#[test]
fn validate_valid_config() {
    let output = run_cli(&["validate", &fixture("duel.yaml")]);
    assert!(
        output.status.success(),
        "validate should succeed for valid config: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("duel.yaml: ok"), "{stdout}");
}

#[test]
fn validate_reports_every_error() {
    let output = run_cli(&["validate", &fixture("invalid_rounds.yaml")]);
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("match.rounds"), "{stdout}");
    assert!(stdout.contains("opponent.accuracy"), "{stdout}");
}

#[test]
fn validate_rejects_unknown_fields() {
    let output = run_cli(&["validate", &fixture("unknown_field.yaml")]);
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("parse error"), "{stdout}");
}

#[test]
fn validate_json_includes_referenced_bank() {
    let output = run_cli(&["validate", "--format", "json", &fixture("with_bank.yaml")]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = stdout_json(&output);
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1]["kind"], "questions");
    assert_eq!(files[1]["warnings"].as_array().unwrap().len(), 1);
    assert_eq!(report["summary"]["valid"], 2);
}

#[test]
fn validate_strict_fails_on_warnings() {
    let output = run_cli(&["validate", "--strict", &fixture("with_bank.yaml")]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn validate_broken_question_bank() {
    let output = run_cli(&[
        "validate",
        "--format",
        "json",
        "--rounds",
        "1",
        "--questions",
        &fixture("broken_bank.yaml"),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let report = stdout_json(&output);
    let errors: Vec<String> = report["files"][0]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap().to_owned())
        .collect();
    assert!(errors.iter().any(|e| e.contains("duplicate option")), "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("correct_answer")), "{errors:?}");
}

#[test]
fn validate_missing_file() {
    let output = run_cli(&["validate", "/tmp/nonexistent_triviaduel_config.yaml"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("file not found"), "{stdout}");
}

#[test]
fn version_json() {
    let output = run_cli(&["version", "--format", "json"]);
    assert!(output.status.success());
    let version = stdout_json(&output);
    assert_eq!(version["name"], "triviaduel");
}

#[test]
fn completions_bash() {
    let output = run_cli(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("triviaduel"));
}

#[test]
fn simulate_json_summary_matches_profile() {
    let output = run_cli(&[
        "simulate",
        "--matches",
        "2",
        "--seed",
        "5",
        "--time-scale",
        "0.001",
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary = stdout_json(&output);
    let matches = summary["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(summary["aborted"], 0);

    let decided = summary["wins"].as_u64().unwrap()
        + summary["losses"].as_u64().unwrap()
        + summary["ties"].as_u64().unwrap();
    assert_eq!(decided, 2);
    assert_eq!(summary["profile"]["duels_won"], summary["wins"]);

    let correct: u64 = matches
        .iter()
        .map(|m| m["correct_answers"].as_u64().unwrap())
        .sum();
    assert_eq!(summary["profile"]["correct_answers"].as_u64(), Some(correct));
}

#[test]
fn simulate_with_config_and_bank() {
    let output = run_cli(&[
        "simulate",
        "--config",
        &fixture("with_bank.yaml"),
        "--time-scale",
        "0.001",
        "--player-accuracy",
        "1",
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(3 correct"), "{stdout}");
    assert!(stdout.contains("1 match(es)"), "{stdout}");
}

#[test]
fn simulate_rejects_zero_matches() {
    let output = run_cli(&["simulate", "--matches", "0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn simulate_unknown_category_suggests() {
    let output = run_cli(&["simulate", "--category", "Exodus - Plages"]);
    assert_eq!(output.status.code(), Some(6));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did you mean 'Exodus - Plagues'"), "{stderr}");
}

#[test]
fn play_exits_when_stdin_closes() {
    let output = run_cli(&["play", "--name", "Ada", "--seed", "1"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Ada: level 1, 0 XP"), "{stdout}");
}

#[test]
fn simulate_streams_events_to_stderr() {
    let output = run_cli(&[
        "simulate",
        "--seed",
        "3",
        "--time-scale",
        "0.001",
        "--events-file",
        "-",
    ]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let events: Vec<Value> = stderr
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    assert_eq!(events[0]["type"], "MatchSearching");
    assert!(events.iter().any(|e| e["type"] == "MatchFinished"));
    assert!(events.iter().any(|e| e["type"] == "RewardsDispatched"));
}

#[test]
fn simulate_rejects_oversized_time_scale() {
    let output = run_cli(&["simulate", "--time-scale", "1e300"]);
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--time-scale must be within"), "{stderr}");
}
