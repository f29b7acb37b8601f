use std::fs;

use assert_cmd::Command;
use outbreak::{DayReport, OutcomeReport};
use tempfile::tempdir;

fn read_rows<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Vec<T> {
    csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn default_run_prints_the_final_census() {
    let output = Command::cargo_bin("outbreak")
        .unwrap()
        .args(["--random-seed", "7", "--days", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("day 2: susceptible="), "{stdout}");
}

#[test]
fn config_file_and_reports() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(
        &config,
        r#"{
            "population_size": 10,
            "initial_infected": 2,
            "num_days": 5,
            "tasks_per_day": 3,
            "task_duration": 2,
            "condition_prevalence": 0.0,
            "seed": 11
        }"#,
    )
    .unwrap();
    let output_dir = dir.path().join("out");

    Command::cargo_bin("outbreak")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--output-dir")
        .arg(&output_dir)
        .assert()
        .success()
        .stdout("day 5: susceptible=8 infected=0 immune=2 dead=0\n");

    let days: Vec<DayReport> = read_rows(&output_dir.join("day_census.csv"));
    assert_eq!(days.len(), 5);
    assert_eq!(days[4].immune, 2);

    let outcomes: Vec<OutcomeReport> = read_rows(&output_dir.join("outcomes.csv"));
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|row| row.day == 5));
}

#[test]
fn existing_reports_need_force_overwrite() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("day_census.csv"), "").unwrap();

    Command::cargo_bin("outbreak")
        .unwrap()
        .args(["--days", "1", "--output-dir"])
        .arg(dir.path())
        .assert()
        .failure();

    Command::cargo_bin("outbreak")
        .unwrap()
        .args(["--days", "1", "--force-overwrite", "--output-dir"])
        .arg(dir.path())
        .assert()
        .success();
}

#[test]
fn bad_config_is_rejected_by_field_name() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"population_size": 3, "initial_infected": 4}"#).unwrap();

    let output = Command::cargo_bin("outbreak")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("initial_infected"), "{stderr}");
}

#[test]
fn bad_log_level_is_rejected() {
    Command::cargo_bin("outbreak")
        .unwrap()
        .args(["--log-level", "loud"])
        .assert()
        .failure();
}

#[test]
fn custom_args_reach_the_setup_function() {
    Command::cargo_bin("runner_test_custom_args")
        .unwrap()
        .args(["--field", "42", "--random-seed", "3"])
        .assert()
        .success()
        .stdout("42 3\n");
}
