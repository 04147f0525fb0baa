//! Integration tests for the consul-up command surface.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn consul_up() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("consul-up"));
    cmd.env("NO_COLOR", "1");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2.
    // A global flag filled from the environment counts as an argument.
    consul_up()
        .env_remove("NO_COLOR")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Install and configure Consul agents"));
}

#[test]
fn test_cli_accepts_any_no_color_value() {
    for value in ["1", "true", "yes", "0"] {
        consul_up()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success();
    }
}

#[test]
fn test_cli_help_lists_commands() {
    consul_up()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_cli_help_hides_reconcile_routine() {
    consul_up()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("_reconcile").not());
}

#[test]
fn test_cli_version_flag_shows_version() {
    consul_up()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("consul-up"));
}

#[test]
fn test_version_command_shows_version() {
    consul_up()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!("consul-up ", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_unknown_command_fails() {
    consul_up()
        .arg("uninstall")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_install_help_lists_target_and_agent_options() {
    let assert = consul_up().args(["install", "--help"]).assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    for flag in [
        "--ip",
        "--user",
        "--ssh-key",
        "--ssh-port",
        "--local",
        "--show",
        "--binary",
        "--version",
        "--routine",
        "--server",
        "--datacenter",
        "--bootstrap-expect",
        "--retry-join",
        "--encrypt",
        "--ca-file",
        "--cert-file",
        "--key-file",
        "--connect",
        "--acl",
        "--agent-token",
    ] {
        assert!(out.contains(flag), "install --help is missing {flag}:\n{out}");
    }
}

// --- Hidden routine ---

#[test]
fn test_reconcile_requires_workspace() {
    consul_up()
        .arg("_reconcile")
        .env_remove("CONSUL_UP_WORKSPACE")
        .env("SERVICE_TYPE", "exec")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--workspace"));
}

#[test]
fn test_reconcile_rejects_unknown_service_type() {
    consul_up()
        .arg("_reconcile")
        .env("CONSUL_UP_WORKSPACE", "/tmp/consul-installation.a1b2c3")
        .env("SERVICE_TYPE", "forking")
        .assert()
        .failure()
        .stderr(predicate::str::contains("forking"));
}

#[test]
fn test_reconcile_rejects_foreign_workspace() {
    consul_up()
        .arg("_reconcile")
        .env("CONSUL_UP_WORKSPACE", "/etc")
        .env("SERVICE_TYPE", "exec")
        .env("CONSUL_VERSION", "")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("not an installation workspace"));
}
