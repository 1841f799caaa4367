use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::tempdir;

fn data_file(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

#[test]
fn run_writes_both_reports() {
    let output = tempdir().unwrap();
    Command::cargo_bin("episim")
        .unwrap()
        .arg("--config")
        .arg(data_file("config.json"))
        .arg("--population")
        .arg(data_file("population.tsv"))
        .arg("--events")
        .arg(data_file("events.tsv"))
        .arg("--policy")
        .arg(data_file("policy.json"))
        .args(["--last-day", "3"])
        .arg("--output-dir")
        .arg(output.path())
        .assert()
        .success();

    let infections = fs::read_to_string(output.path().join("infections.txt")).unwrap();
    let mut lines = infections.lines();
    assert!(lines.next().unwrap().starts_with("time\tnInfected\t"));
    // Two persons are seeded on day 0, so the run lasts until the last day.
    assert_eq!(lines.count(), 4);
    let events = fs::read_to_string(output.path().join("infectionEvents.txt")).unwrap();
    assert!(events.starts_with("time\tinfector\tinfected\tinfectionType"));
}

#[test]
fn existing_output_needs_force_overwrite() {
    let output = tempdir().unwrap();
    let run = |force: bool| {
        let mut command = Command::cargo_bin("episim").unwrap();
        command
            .arg("--config")
            .arg(data_file("config.json"))
            .arg("--events")
            .arg(data_file("events.tsv"))
            .args(["--last-day", "0"])
            .arg("--output-dir")
            .arg(output.path());
        if force {
            command.arg("--force-overwrite");
        }
        command.assert()
    };

    run(false).success();
    run(false).failure();
    run(true).success();
}

#[test]
fn invalid_events_fail_the_run() {
    let output = tempdir().unwrap();
    let assert = Command::cargo_bin("episim")
        .unwrap()
        .arg("--events")
        .arg(data_file("invalid_events.tsv"))
        .arg("--output-dir")
        .arg(output.path())
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("Invalid event"), "unexpected stderr: {stderr}");
}

#[test]
fn events_are_required() {
    Command::cargo_bin("episim").unwrap().assert().failure();
}
