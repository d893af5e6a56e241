use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Reference CLI for the Volant microVM control plane"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("vm"))
        .stdout(predicate::str::contains("deployment"))
        .stdout(predicate::str::contains("plugin"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.arg("--version");

    cmd.assert().success().stdout(predicate::str::contains("volant"));
}

#[test]
fn test_cli_vm_help() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.arg("vm").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Manage virtual machines"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"));
}

#[test]
fn test_cli_deployment_help() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.arg("deployment").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Manage deployments"))
        .stdout(predicate::str::contains("scale"));
}

#[test]
fn test_cli_plugin_help() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.arg("plugin").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Manage installed plugins"))
        .stdout(predicate::str::contains("install"));
}

#[test]
fn test_cli_env_var_api_url() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.env("VOLANT_API_URL", "http://127.0.0.1:1");
    cmd.arg("vm").arg("list");

    cmd.assert().failure();
}

#[test]
fn test_cli_invalid_command() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.arg("invalid-command");

    cmd.assert().failure().stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_cli_missing_required_args() {
    let mut cmd = Command::cargo_bin("volant").unwrap();
    cmd.arg("vm").arg("create");

    cmd.assert().failure().stderr(predicate::str::contains("required"));
}
