//! Whole-run sequencing: sticky failure, dependency skips and teardown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use clustervet_cli::application::services::sequencer::{Collaborators, SuiteSummary, run_suite};
use clustervet_cli::domain::{Outcome, Scenario, Teardown};

use crate::helpers::{
    KUBECONFIG, MemoryKubeconfigStore, RecordingReporter, ScriptedExecutor, StubProvisioner,
    harness_config, healthy_cluster, node_table,
};

fn outcome(summary: &SuiteSummary, scenario: Scenario) -> &Outcome {
    summary
        .report
        .outcome_of(scenario)
        .unwrap_or_else(|| panic!("{scenario:?} was not recorded"))
}

/// A three-server cluster that comes up, with server-0 refusing to stop.
fn stubborn_cluster() -> ScriptedExecutor {
    let stuck = node_table(&[
        ("server-0", "Ready"),
        ("server-1", "Ready"),
        ("server-2", "NotReady"),
    ]);
    let ready = node_table(&[
        ("server-0", "Ready"),
        ("server-1", "Ready"),
        ("server-2", "Ready"),
    ]);
    ScriptedExecutor::new()
        .on_host("server-0", "rke2.yaml", KUBECONFIG)
        .on_host("server-0", "eth1", "10.10.10.100\n")
        .local_seq("get nodes", &[&stuck, &ready])
        .fail_on("server-0", "systemctl stop")
}

#[tokio::test(start_paused = true)]
async fn provisioning_failure_skips_everything_else() {
    let exec = ScriptedExecutor::new();
    let provisioner = StubProvisioner::failing();
    let store = MemoryKubeconfigStore::default();
    let reporter = RecordingReporter::default();
    let c = Collaborators {
        exec: &exec,
        provisioner: &provisioner,
        store: &store,
        reporter: &reporter,
    };

    let summary = run_suite(&c, &harness_config(3, 1, false)).await;

    assert_eq!(summary.report.scenarios.len(), Scenario::ALL.len());
    assert!(outcome(&summary, Scenario::CreateCluster).is_failed());
    for result in &summary.report.scenarios[1..] {
        assert_eq!(
            result.outcome,
            Outcome::Skipped("provisioning failed".to_string()),
            "{:?}",
            result.scenario
        );
    }
    let create = &summary.report.scenarios[0];
    assert!(create.diagnostics[0].starts_with("provisioning log:"));

    assert!(!summary.succeeded());
    assert_eq!(summary.teardown, Teardown::Preserve);
    assert!(summary.kubeconfig.is_none());
    assert_eq!(provisioner.destroy_count(), 0);
    assert!(exec.calls().is_empty());
    assert!(
        reporter
            .lines()
            .iter()
            .any(|l| l.contains("FAILED! Cluster left running for inspection"))
    );
}

#[tokio::test(start_paused = true)]
async fn failed_ci_run_still_destroys() {
    let provisioner = StubProvisioner::failing();
    let exec = ScriptedExecutor::new();
    let store = MemoryKubeconfigStore::default();
    let reporter = RecordingReporter::default();
    let c = Collaborators {
        exec: &exec,
        provisioner: &provisioner,
        store: &store,
        reporter: &reporter,
    };

    let summary = run_suite(&c, &harness_config(1, 0, true)).await;

    assert_eq!(summary.teardown, Teardown::Destroy);
    assert_eq!(provisioner.destroy_count(), 1);
    assert!(summary.teardown_error.is_none());
    assert!(!summary.succeeded(), "a failed scenario still fails the run");
}

#[tokio::test(start_paused = true)]
async fn dependent_scenarios_are_skipped_and_the_cluster_preserved() {
    let exec = stubborn_cluster();
    let provisioner = StubProvisioner::default();
    let store = MemoryKubeconfigStore::default();
    let reporter = RecordingReporter::default();
    let c = Collaborators {
        exec: &exec,
        provisioner: &provisioner,
        store: &store,
        reporter: &reporter,
    };

    let summary = run_suite(&c, &harness_config(3, 0, false)).await;

    assert_eq!(outcome(&summary, Scenario::CreateCluster), &Outcome::Passed);
    assert_eq!(
        outcome(&summary, Scenario::NodeStatus),
        &Outcome::Passed,
        "NotReady then Ready converges"
    );
    match outcome(&summary, Scenario::StopAndRotateCertificates) {
        Outcome::Failed(reason) => assert!(reason.contains("server-0"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        outcome(&summary, Scenario::StartAfterRotation),
        &Outcome::Skipped(format!(
            "requires \"{}\" to pass",
            Scenario::StopAndRotateCertificates
        ))
    );
    assert_eq!(
        outcome(&summary, Scenario::ValidateCertificates),
        &Outcome::Skipped(format!("requires \"{}\" to pass", Scenario::StartAfterRotation))
    );
    assert!(
        !exec
            .host_log()
            .iter()
            .any(|c| c.contains("--no-block") || c.contains("certificate rotate")),
        "skipped scenarios never touch a host"
    );

    assert!(summary.report.failed());
    assert_eq!(summary.teardown, Teardown::Preserve);
    assert_eq!(summary.kubeconfig.as_deref(), Some("/tmp/kubeconfig-server-0"));
    assert!(store.removed().is_empty());
    assert_eq!(provisioner.destroy_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn ci_teardown_removes_the_kubeconfig() {
    let exec = stubborn_cluster();
    let provisioner = StubProvisioner::default();
    let store = MemoryKubeconfigStore::default();
    let reporter = RecordingReporter::default();
    let c = Collaborators {
        exec: &exec,
        provisioner: &provisioner,
        store: &store,
        reporter: &reporter,
    };

    let summary = run_suite(&c, &harness_config(3, 0, true)).await;

    assert_eq!(summary.teardown, Teardown::Destroy);
    assert_eq!(provisioner.destroy_count(), 1);
    assert_eq!(store.removed().len(), 1);
    assert!(summary.kubeconfig.is_none());
}

#[tokio::test(start_paused = true)]
async fn failures_capture_cluster_diagnostics() {
    let exec = stubborn_cluster();
    let provisioner = StubProvisioner::default();
    let store = MemoryKubeconfigStore::default();
    let reporter = RecordingReporter::default();
    let c = Collaborators {
        exec: &exec,
        provisioner: &provisioner,
        store: &store,
        reporter: &reporter,
    };

    let summary = run_suite(&c, &harness_config(3, 0, false)).await;

    let rotate = summary
        .report
        .scenarios
        .iter()
        .find(|r| r.scenario == Scenario::StopAndRotateCertificates)
        .unwrap();
    assert_eq!(rotate.diagnostics.len(), 2);
    assert!(rotate.diagnostics[0].starts_with("$ kubectl get nodes -o wide"));
    assert!(rotate.diagnostics[1].starts_with("$ kubectl get pods -A -o wide"));
}

#[tokio::test(start_paused = true)]
async fn healthy_cluster_passes_every_scenario_and_is_destroyed() {
    let exec = healthy_cluster(3, 1);
    let provisioner = StubProvisioner::default();
    let store = MemoryKubeconfigStore::default();
    let reporter = RecordingReporter::default();
    let c = Collaborators {
        exec: &exec,
        provisioner: &provisioner,
        store: &store,
        reporter: &reporter,
    };

    let summary = run_suite(&c, &harness_config(3, 1, false)).await;

    for result in &summary.report.scenarios {
        assert_eq!(result.outcome, Outcome::Passed, "{:?}", result.scenario);
        assert!(result.diagnostics.is_empty());
    }
    assert_eq!(summary.report.counts(), (Scenario::ALL.len(), 0, 0));
    assert!(summary.succeeded());
    assert_eq!(summary.teardown, Teardown::Destroy);
    assert_eq!(provisioner.destroy_count(), 1);
    assert_eq!(store.removed(), [std::path::PathBuf::from("/tmp/kubeconfig-server-0")]);
    assert!(summary.kubeconfig.is_none());
    assert!(reporter.lines().iter().any(|l| l == "success: cluster destroyed"));

    let log = exec.host_log();
    let seed = log
        .iter()
        .position(|c| c == "server-0: sudo systemctl --no-block start rke2-server")
        .expect("quorum seeded");
    let rotated = log
        .iter()
        .rposition(|c| c.ends_with("sudo rke2 certificate rotate"))
        .expect("rotated");
    assert!(rotated < seed, "rotation happens while every server is stopped");
    for server in ["server-0", "server-1", "server-2"] {
        assert!(
            log.iter().any(|c| c.starts_with(&format!("{server}: sudo diff -sr"))),
            "{server} certificates compared"
        );
    }
}
