//! Integration tests for the CLI surface: argument parsing, version output,
//! configuration validation and the one-shot snapshot commands.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn clustervet() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("clustervet"));
    cmd.env("NO_COLOR", "1")
        .env_remove("CI")
        .env_remove("E2E_NODE_OS")
        .env_remove("E2E_CNI")
        .env_remove("E2E_RELEASE_VERSION")
        .env_remove("CLUSTERVET_CONFIG")
        .env_remove("KUBECONFIG");
    cmd
}

// --- Help and version ---

#[test]
fn test_no_args_shows_help() {
    clustervet().assert().code(2).stderr(predicate::str::contains(
        "End-to-end validation for freshly provisioned RKE2 clusters",
    ));
}

#[test]
fn test_help_lists_subcommands() {
    clustervet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("nodes"))
        .stdout(predicate::str::contains("pods"));
}

#[test]
fn test_run_help_lists_cluster_flags() {
    clustervet()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--server-count"))
        .stdout(predicate::str::contains("--agent-count"))
        .stdout(predicate::str::contains("--node-os"))
        .stdout(predicate::str::contains("--ci"));
}

#[test]
fn test_version_command() {
    clustervet()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("clustervet"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_json() {
    let output = clustervet()
        .args(["version", "--json"])
        .output()
        .expect("spawn");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_unknown_subcommand_fails() {
    clustervet().arg("frobnicate").assert().code(2);
}

// --- Configuration validation (fails before any host is touched) ---

#[test]
fn test_run_accepts_numeric_ci_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    clustervet()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("CI", "1")
        .args(["run", "--server-count", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("server_count must be at least 1"))
        .stderr(predicate::str::contains("--ci").not());
}

#[test]
fn test_run_accepts_named_ci_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    clustervet()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("CI", "woodpecker")
        .args(["run", "--server-count", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("server_count must be at least 1"));
}

#[test]
fn test_run_rejects_zero_servers() {
    let dir = tempfile::tempdir().expect("tempdir");
    clustervet()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .args(["run", "--server-count", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("server_count must be at least 1"));
    assert!(!dir.path().join("vagrant.log").exists());
}

#[test]
fn test_run_rejects_unknown_cni() {
    let dir = tempfile::tempdir().expect("tempdir");
    clustervet()
        .env("HOME", dir.path())
        .args(["run", "--cni", "flannel"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("flannel"))
        .stderr(predicate::str::contains("canal, cilium, calico"));
}

#[test]
fn test_run_rejects_bad_release_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    clustervet()
        .env("HOME", dir.path())
        .args(["run", "--release-version", "latest"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("release_version"));
}

#[test]
fn test_run_with_missing_config_file_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    clustervet()
        .args(["--config"])
        .arg(dir.path().join("absent.yaml"))
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_config_file_budget_is_validated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "budgets:\n  dns: { timeout_secs: 10, interval_secs: 0 }\n",
    )
    .expect("write config");
    clustervet()
        .env("CLUSTERVET_CONFIG", &path)
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("budget dns"));
}

// --- Snapshot commands ---

#[test]
fn test_nodes_requires_kubeconfig() {
    clustervet()
        .arg("nodes")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--kubeconfig"));
}
