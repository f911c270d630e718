use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn help_describes_the_client() {
    let mut cmd = Command::cargo_bin("readtrack").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("ReadTracker"))
        .stdout(predicates::str::contains("--demo"))
        .stdout(predicates::str::contains("--endpoint"));
}

#[test]
fn version_flag_works() {
    let mut cmd = Command::cargo_bin("readtrack").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("readtrack"));
}

#[test]
fn unknown_flag_is_rejected() {
    let mut cmd = Command::cargo_bin("readtrack").unwrap();
    cmd.arg("--definitely-not-a-flag");
    cmd.assert().failure();
}
