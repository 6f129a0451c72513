use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("eab-gdd").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn models_lists_all_candidate_forms() {
    let mut cmd = Command::cargo_bin("eab-gdd").unwrap();
    cmd.arg("models").arg("--response").arg("pos2");
    cmd.assert()
        .success()
        .stdout(contains("tree\t"))
        .stdout(contains("gdd\t"))
        .stdout(contains("gdd_direction\t"))
        .stdout(contains("direction\t"))
        .stdout(contains("pos2"));
}
