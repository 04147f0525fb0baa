//! Integration tests for `consul-up install` paths that never reach a target.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with an isolated, empty config file.
fn consul_up(config_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("consul-up"));
    cmd.env("NO_COLOR", "1")
        .env("CONSUL_UP_CONFIG", config_dir.path().join("config.yaml"));
    cmd
}

fn config_dir() -> TempDir {
    TempDir::new().expect("temp dir")
}

#[test]
fn test_show_prints_default_client_config() {
    let dir = config_dir();
    consul_up(&dir)
        .args(["install", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"datacenter = "dc1""#))
        .stdout(predicate::str::contains(r#"data_dir = "/opt/consul""#))
        .stdout(predicate::str::contains("server").not());
}

#[test]
fn test_show_renders_server_options() {
    let dir = config_dir();
    consul_up(&dir)
        .args([
            "install",
            "--show",
            "--server",
            "--bootstrap-expect",
            "3",
            "--retry-join",
            "10.0.0.2",
            "--retry-join",
            "10.0.0.3",
            "--bind",
            "10.0.0.1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("server = true"))
        .stdout(predicate::str::contains("bootstrap_expect = 3"))
        .stdout(predicate::str::contains(r#"retry_join = ["10.0.0.2", "10.0.0.3"]"#))
        .stdout(predicate::str::contains(r#"bind_addr = "10.0.0.1""#));
}

#[test]
fn test_show_with_tls_points_at_installed_credentials() {
    let dir = config_dir();
    consul_up(&dir)
        .args([
            "install",
            "--show",
            "--ca-file",
            "ca.pem",
            "--cert-file",
            "agent.pem",
            "--key-file",
            "agent-key.pem",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"ca_file = "/etc/consul.d/consul-agent-ca.pem""#))
        .stdout(predicate::str::contains("verify_incoming = true"))
        .stdout(predicate::str::contains("https = 8501"));
}

#[test]
fn test_show_with_acl_and_token() {
    let dir = config_dir();
    consul_up(&dir)
        .args(["install", "--show", "--acl", "--agent-token", "t0ken"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"default_policy = "deny""#))
        .stdout(predicate::str::contains(r#"agent = "t0ken""#));
}

#[test]
fn test_partial_tls_flags_fail_before_connecting() {
    let dir = config_dir();
    consul_up(&dir)
        .args(["install", "--ca-file", "ca.pem", "--cert-file", "agent.pem"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Connecting").not());
}

#[test]
fn test_partial_tls_flags_fail_even_with_show() {
    let dir = config_dir();
    consul_up(&dir)
        .args(["install", "--show", "--key-file", "agent-key.pem"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_invalid_version_fails_before_connecting() {
    let dir = config_dir();
    consul_up(&dir)
        .args(["install", "--version", "latest-ish"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid version"));
}

#[test]
fn test_local_conflicts_with_ssh_options() {
    let dir = config_dir();
    consul_up(&dir)
        .args(["install", "--local", "--ssh-port", "2222", "--show"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}
