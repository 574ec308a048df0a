//! Cluster handle lifecycle: creation, service control order, fan-out
//! attribution and teardown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use clustervet_cli::application::services::cluster;
use clustervet_cli::domain::{
    ClusterState, FanOutError, Host, ProvisioningError, ServiceState, Workload,
};

use crate::helpers::{
    KUBECONFIG, MemoryKubeconfigStore, RecordingReporter, ScriptedExecutor, StubProvisioner,
    harness_config, running_handle,
};

fn up_executor() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .on_host("server-0", "rke2.yaml", KUBECONFIG)
        .on_host("server-0", "eth1", "10.10.10.100\n")
}

// ── Creation ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn create_writes_a_kubeconfig_pointing_at_the_first_server() {
    let provisioner = StubProvisioner::default();
    let exec = up_executor();
    let store = MemoryKubeconfigStore::default();
    let config = harness_config(3, 1, false);

    let handle = cluster::create(&provisioner, &exec, &store, &RecordingReporter::default(), &config)
        .await
        .unwrap();

    assert_eq!(handle.state(), ClusterState::Running);
    assert_eq!(
        provisioner.provisioned_hosts(),
        ["server-0", "server-1", "server-2", "agent-0"]
    );
    let written = store.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].0, PathBuf::from("/tmp/kubeconfig-server-0"));
    assert!(written[0].1.contains("https://10.10.10.100:6443"));
    assert!(!written[0].1.contains("127.0.0.1"));
    assert_eq!(handle.kubeconfig().unwrap(), written[0].0.as_path());
}

#[tokio::test(start_paused = true)]
async fn create_retries_until_the_first_server_answers() {
    let exec = ScriptedExecutor::new()
        .on_host("server-0", "eth1", "10.10.10.100\n")
        .fail_on("server-0", "rke2.yaml");
    let store = MemoryKubeconfigStore::default();
    let config = harness_config(1, 0, false);

    let err = cluster::create(
        &StubProvisioner::default(),
        &exec,
        &store,
        &RecordingReporter::default(),
        &config,
    )
    .await
    .expect_err("server never answers");

    assert!(err.downcast_ref::<ProvisioningError>().is_some());
    let attempts = exec
        .host_log()
        .iter()
        .filter(|c| c.contains("rke2.yaml"))
        .count();
    assert!(attempts > 1, "polled the first server ({attempts} attempts)");
    assert!(store.written().is_empty());
}

#[tokio::test]
async fn provisioning_failure_carries_the_log_tail() {
    let exec = ScriptedExecutor::new();
    let err = cluster::create(
        &StubProvisioner::failing(),
        &exec,
        &MemoryKubeconfigStore::default(),
        &RecordingReporter::default(),
        &harness_config(3, 1, false),
    )
    .await
    .expect_err("provisioning fails");

    let provisioning = err.downcast_ref::<ProvisioningError>().expect("fatal error");
    assert!(provisioning.reason.contains("vagrant up"));
    assert!(
        provisioning
            .log
            .as_deref()
            .is_some_and(|log| log.contains("could not be found"))
    );
    assert!(exec.calls().is_empty(), "no host is contacted");
}

// ── Workloads ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deploy_applies_the_manifest_with_the_cluster_kubeconfig() {
    let exec = ScriptedExecutor::new();
    let handle = running_handle(1, 0);
    cluster::deploy_workload(&exec, &handle, Workload::DaemonSet)
        .await
        .unwrap();
    let calls = exec.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].host.is_none());
    assert!(
        calls[0]
            .command
            .starts_with("kubectl apply -f /manifests/daemonset.yaml"),
        "{}",
        calls[0].command
    );
    assert!(calls[0].command.ends_with("--kubeconfig=/tmp/kubeconfig-server-0"));
}

// ── Service control ──────────────────────────────────────────────────────────

#[tokio::test]
async fn quorum_safe_start_seeds_the_first_server_without_blocking() {
    let exec = ScriptedExecutor::new();
    let mut handle = running_handle(3, 0);
    let servers = handle.servers().to_vec();
    cluster::stop(&exec, &mut handle, &servers).await.unwrap();
    assert_eq!(handle.state(), ClusterState::Stopped);

    cluster::start_quorum_safe(&exec, &mut handle, &servers)
        .await
        .unwrap();

    let starts: Vec<String> = exec
        .host_log()
        .into_iter()
        .filter(|c| c.contains("systemctl") && c.contains("start rke2-server"))
        .collect();
    assert_eq!(starts.len(), 3);
    assert_eq!(starts[0], "server-0: sudo systemctl --no-block start rke2-server");
    let mut rest = starts[1..].to_vec();
    rest.sort();
    assert_eq!(
        rest,
        [
            "server-1: sudo systemctl start rke2-server",
            "server-2: sudo systemctl start rke2-server",
        ]
    );
    assert_eq!(handle.state(), ClusterState::Running);
}

#[tokio::test]
async fn failed_seed_starts_nothing_else() {
    let exec = ScriptedExecutor::new().fail_on("server-0", "--no-block");
    let mut handle = running_handle(3, 0);
    let servers = handle.servers().to_vec();
    cluster::stop(&exec, &mut handle, &servers).await.unwrap();

    let err = cluster::start_quorum_safe(&exec, &mut handle, &servers)
        .await
        .expect_err("seed fails");
    assert!(format!("{err:#}").contains("seeding quorum on server-0"));
    assert!(
        !exec
            .host_log()
            .iter()
            .any(|c| c.starts_with("server-1") && c.contains("start")),
        "{:?}",
        exec.host_log()
    );
}

#[tokio::test]
async fn restart_failure_names_the_failing_host() {
    let exec = ScriptedExecutor::new().fail_on("server-1", "restart");
    let mut handle = running_handle(3, 0);
    let servers = handle.servers().to_vec();

    let err = cluster::restart(&exec, &mut handle, &servers)
        .await
        .expect_err("server-1 fails");

    let fan_out = err.downcast_ref::<FanOutError>().expect("per-host error");
    assert_eq!(fan_out.failed_hosts(), ["server-1"]);
    assert!(err.to_string().contains("1 of 3 hosts"), "{err}");
    let restarted = exec
        .host_log()
        .iter()
        .filter(|c| c.contains("systemctl restart"))
        .count();
    assert_eq!(restarted, 3, "every host attempted");
    assert_eq!(handle.state(), ClusterState::Running);
}

#[tokio::test]
async fn rotation_requires_every_server_stopped() {
    let exec = ScriptedExecutor::new();
    let mut handle = running_handle(2, 1);
    let first = vec![Host::server(0)];
    cluster::stop(&exec, &mut handle, &first).await.unwrap();
    assert_eq!(
        handle.service_state(&Host::server(1)),
        Some(ServiceState::Running)
    );

    let servers = handle.servers().to_vec();
    let err = cluster::rotate_certificates(&exec, &handle, &servers)
        .await
        .expect_err("server-1 still up");
    assert!(err.to_string().contains("server-1 is still running"), "{err}");
    assert!(!exec.host_log().iter().any(|c| c.contains("certificate rotate")));

    cluster::stop(&exec, &mut handle, &servers).await.unwrap();
    cluster::rotate_certificates(&exec, &handle, &servers)
        .await
        .unwrap();
    let rotations = exec
        .host_log()
        .iter()
        .filter(|c| c.ends_with("sudo rke2 certificate rotate"))
        .count();
    assert_eq!(rotations, 2);
}

// ── Teardown ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn destroy_removes_the_kubeconfig_once() {
    let provisioner = StubProvisioner::default();
    let store = MemoryKubeconfigStore::default();
    let mut handle = running_handle(1, 1);

    cluster::destroy(&provisioner, &store, &mut handle)
        .await
        .unwrap();
    assert_eq!(handle.state(), ClusterState::Destroyed);
    assert_eq!(store.removed(), [PathBuf::from("/tmp/kubeconfig-server-0")]);
    assert!(handle.kubeconfig().is_err());

    let again = cluster::destroy(&provisioner, &store, &mut handle).await;
    assert!(again.is_err(), "a cluster is destroyed once");
    assert_eq!(provisioner.destroy_count(), 1);
}

#[tokio::test]
async fn service_control_after_destroy_is_rejected() {
    let exec = ScriptedExecutor::new();
    let mut handle = running_handle(1, 0);
    cluster::destroy(&StubProvisioner::default(), &MemoryKubeconfigStore::default(), &mut handle)
        .await
        .unwrap();
    let servers = handle.servers().to_vec();
    assert!(cluster::stop(&exec, &mut handle, &servers).await.is_err());
    assert!(exec.calls().is_empty());
}
