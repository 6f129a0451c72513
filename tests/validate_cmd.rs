use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn write_inputs(dir: &Path) {
    fs::write(
        dir.join("detections.tsv"),
        "tree\t1N\t2N\t3N\nA\t0\t1\t3\nB\t0\tNA\t2\n",
    )
    .unwrap();
    fs::write(dir.join("gdd.tsv"), "day\tgdd\n1\t100\n2\t150\n3\t220\n").unwrap();
}

#[test]
fn validate_command_ok() {
    let tmp = TempDir::new().unwrap();
    write_inputs(tmp.path());

    let mut cmd = Command::cargo_bin("eab-gdd").unwrap();
    cmd.arg("validate")
        .arg("--detections")
        .arg(tmp.path().join("detections.tsv"))
        .arg("--gdd")
        .arg(tmp.path().join("gdd.tsv"));
    cmd.assert()
        .success()
        .stdout(contains("validate ok"))
        .stdout(contains("records: 5"));
}

#[test]
fn validate_fails_on_missing_gdd_when_strict() {
    let tmp = TempDir::new().unwrap();
    write_inputs(tmp.path());
    fs::write(tmp.path().join("gdd.tsv"), "day\tgdd\n1\t100\n2\t150\n").unwrap();

    let mut cmd = Command::cargo_bin("eab-gdd").unwrap();
    cmd.arg("validate")
        .arg("--detections")
        .arg(tmp.path().join("detections.tsv"))
        .arg("--gdd")
        .arg(tmp.path().join("gdd.tsv"))
        .arg("--missing-gdd")
        .arg("fail");
    cmd.assert().failure().stderr(contains("no GDD entry for day '3'"));
}

#[test]
fn validate_reports_excluded_cells() {
    let tmp = TempDir::new().unwrap();
    write_inputs(tmp.path());
    fs::write(tmp.path().join("gdd.tsv"), "day\tgdd\n1\t100\n2\t150\n").unwrap();

    let mut cmd = Command::cargo_bin("eab-gdd").unwrap();
    cmd.arg("validate")
        .arg("--detections")
        .arg(tmp.path().join("detections.tsv"))
        .arg("--gdd")
        .arg(tmp.path().join("gdd.tsv"));
    cmd.assert()
        .success()
        .stdout(contains("records: 3"))
        .stdout(contains("excluded: 2"))
        .stdout(contains("warnings:"));
}
