use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn sleepwave() -> Command {
    Command::cargo_bin("sleepwave").unwrap()
}

fn generate(dir: &Path, pattern: &str, records: usize) -> PathBuf {
    let path = dir.join(format!("{}.edf", pattern));
    sleepwave()
        .args(["generate", "--pattern", pattern, "--seed", "3"])
        .args(["--records", &records.to_string()])
        .arg(&path)
        .assert()
        .success();
    path
}

fn stream_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_no_args_shows_help() {
    sleepwave()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_info_prints_header_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = generate(dir.path(), "n2", 12);

    let output = sleepwave().arg("info").arg(&path).output().unwrap();
    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["record_count"], 12);
    assert_eq!(info["channel_count"], 1);
    assert_eq!(info["header_len"], 512);
    assert_eq!(info["signals"][0]["label"], "EEG Fpz-Cz");
    assert_eq!(info["sample_rates_hz"][0], 100.0);
}

#[test]
fn test_stream_emits_json_lines_until_done() {
    let dir = tempfile::tempdir().unwrap();
    let path = generate(dir.path(), "n3", 40);
    let hypnogram = dir.path().join("hypnogram.json");

    let output = sleepwave()
        .arg("stream")
        .arg(&path)
        .args(["--interval-ms", "1", "--step-seconds", "5"])
        .args(["--display-seconds", "5", "--analysis-seconds", "10"])
        .arg("--hypnogram")
        .arg(&hypnogram)
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = stream_lines(&output.stdout);
    assert_eq!(events.len(), 9);
    assert_eq!(events[0]["event"], "data");
    assert_eq!(events[0]["analysis_ready"], false);
    assert_eq!(events[1]["stage"], "N3");
    assert_eq!(events[7]["samples_read"], 4000);
    assert_eq!(events[8]["event"], "done");
    assert_eq!(events[8]["reason"], "end_of_recording");

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&hypnogram).unwrap()).unwrap();
    assert_eq!(report["stages"].as_array().unwrap().len(), 7);
    assert_eq!(report["summary"]["stage_seconds"]["N3"], 35.0);
}

#[test]
fn test_hypnogram_report_matches_done_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = generate(dir.path(), "n3", 5);
    let hypnogram = dir.path().join("hypnogram.json");

    // 0.015 s at 100 Hz rounds to a two-sample step
    let output = sleepwave()
        .arg("stream")
        .arg(&path)
        .args(["--interval-ms", "1", "--step-seconds", "0.015"])
        .args(["--display-seconds", "0.1", "--analysis-seconds", "0.2"])
        .args(["--max-ticks", "40"])
        .arg("--hypnogram")
        .arg(&hypnogram)
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = stream_lines(&output.stdout);
    let done = events.last().unwrap();
    assert_eq!(done["event"], "done");
    assert_eq!(done["reason"], "max_ticks");

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&hypnogram).unwrap()).unwrap();
    assert_eq!(report["epoch_seconds"], 0.02);
    assert_eq!(report["epoch_seconds"], done["hypnogram"]["epoch_seconds"]);
    assert_eq!(report["summary"], done["hypnogram"]);
}

#[test]
fn test_stream_respects_max_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let path = generate(dir.path(), "awake", 60);

    let output = sleepwave()
        .arg("stream")
        .arg(&path)
        .args(["--interval-ms", "1", "--step-seconds", "1", "--max-ticks", "3"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = stream_lines(&output.stdout);
    assert_eq!(events.len(), 4);
    assert_eq!(events[3]["reason"], "max_ticks");
}

#[test]
fn test_stream_unknown_channel_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = generate(dir.path(), "rem", 5);

    sleepwave()
        .arg("stream")
        .arg(&path)
        .args(["--channel", "EMG submental", "--interval-ms", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("EMG submental"));
}

#[test]
fn test_info_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.edf");
    std::fs::write(&path, b"not a recording").unwrap();

    sleepwave()
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed header"));
}

#[test]
fn test_generate_rejects_unknown_pattern() {
    let dir = tempfile::tempdir().unwrap();
    sleepwave()
        .args(["generate", "--pattern", "lucid"])
        .arg(dir.path().join("x.edf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown pattern"));
}
