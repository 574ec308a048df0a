//! State parsers and the readiness scenarios built on them.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use clustervet_cli::application::services::scenarios::{ScenarioEnv, readiness};
use clustervet_cli::application::services::state::{parse_nodes, parse_pods};
use clustervet_cli::domain::{NodeStatus, ParseError, PodStatus, PollBudget};

use crate::helpers::{RecordingReporter, ScriptedExecutor, fast_budgets, node_table};

const KUBECONFIG: &str = "/tmp/kubeconfig-server-0";

const PODS: &str = "\
kube-system   helm-install-rke2-canal-x7k2p            0/1   Completed   0             9m    10.42.0.3    server-0   <none>   <none>
kube-system   rke2-coredns-rke2-coredns-5d8f7-abcde    1/1   Running     2 (5m ago)    9m    10.42.0.4    server-0   <none>   <none>
default       test-daemonset-q8z4r                     1/1   Running     0             2m    10.42.1.7    agent-0    <none>   <none>
";

#[tokio::test]
async fn nodes_keep_output_order() {
    let table = node_table(&[
        ("server-0", "Ready"),
        ("server-1", "NotReady"),
        ("agent-0", "Ready"),
    ]);
    let exec = ScriptedExecutor::new().local("get nodes", &table);
    let reporter = RecordingReporter::default();

    let nodes = parse_nodes(&exec, &reporter, Path::new(KUBECONFIG), false)
        .await
        .unwrap();

    let seen: Vec<(&str, NodeStatus)> = nodes.iter().map(|n| (n.name.as_str(), n.status)).collect();
    assert_eq!(
        seen,
        [
            ("server-0", NodeStatus::Ready),
            ("server-1", NodeStatus::NotReady),
            ("agent-0", NodeStatus::Ready),
        ]
    );
    assert!(reporter.lines().is_empty(), "nothing printed without print");
}

#[tokio::test]
async fn printing_does_not_change_the_result() {
    let exec = ScriptedExecutor::new().local("get pods", PODS);
    let quiet = RecordingReporter::default();
    let loud = RecordingReporter::default();

    let silent = parse_pods(&exec, &quiet, Path::new(KUBECONFIG), false)
        .await
        .unwrap();
    let printed = parse_pods(&exec, &loud, Path::new(KUBECONFIG), true)
        .await
        .unwrap();

    assert_eq!(silent, printed);
    let lines = loud.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("dump: Pods\n"));
    assert!(lines[0].contains("test-daemonset-q8z4r"));
}

#[tokio::test]
async fn pod_rows_are_typed() {
    let exec = ScriptedExecutor::new().local("get pods", PODS);
    let pods = parse_pods(&exec, &RecordingReporter::default(), Path::new(KUBECONFIG), false)
        .await
        .unwrap();
    assert_eq!(pods[0].status, PodStatus::Completed);
    assert_eq!(pods[1].restarts, "2 (5m ago)");
    assert_eq!(pods[2].node.as_deref(), Some("agent-0"));
    assert!(pods.iter().all(|p| p.ensure_settled().is_ok()));
}

#[tokio::test]
async fn unknown_status_is_a_parse_error() {
    let exec = ScriptedExecutor::new().local(
        "get nodes",
        "server-0   Exploding   control-plane   5m   v1.31.1   10.0.0.1   <none>   Ubuntu\n",
    );
    let err = parse_nodes(&exec, &RecordingReporter::default(), Path::new(KUBECONFIG), false)
        .await
        .expect_err("bad status");
    let parse = err.downcast_ref::<ParseError>().expect("typed parse error");
    assert_eq!(parse.line, 1);
    assert!(format!("{err:#}").contains("get nodes"), "names the command");
}

// ── Readiness end to end ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn node_readiness_cites_the_not_ready_node() {
    let stuck = node_table(&[
        ("server-0", "Ready"),
        ("server-1", "Ready"),
        ("server-2", "NotReady"),
    ]);
    let exec = ScriptedExecutor::new().local("get nodes", &stuck);
    let reporter = RecordingReporter::default();
    let budgets = fast_budgets();
    let env = ScenarioEnv::new(&exec, &reporter, &budgets);

    let err = readiness::nodes_ready(&env, Path::new(KUBECONFIG), PollBudget::secs(10, 2))
        .await
        .expect_err("server-2 never becomes ready");
    let message = format!("{err:#}");
    assert!(message.contains("node server-2 is NotReady"), "{message}");
    assert!(!message.contains("server-0 is"), "{message}");
}

#[tokio::test(start_paused = true)]
async fn node_readiness_passes_once_the_last_node_recovers() {
    let stuck = node_table(&[
        ("server-0", "Ready"),
        ("server-1", "Ready"),
        ("server-2", "NotReady"),
    ]);
    let healed = node_table(&[
        ("server-0", "Ready"),
        ("server-1", "Ready"),
        ("server-2", "Ready"),
    ]);
    let exec = ScriptedExecutor::new().local_seq("get nodes", &[&stuck, &stuck, &healed]);
    let reporter = RecordingReporter::default();
    let budgets = fast_budgets();
    let env = ScenarioEnv::new(&exec, &reporter, &budgets);

    let nodes = readiness::nodes_ready(&env, Path::new(KUBECONFIG), PollBudget::secs(10, 2))
        .await
        .unwrap();
    assert!(nodes.iter().all(|n| n.status == NodeStatus::Ready));
    assert_eq!(exec.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn pending_helm_job_keeps_pods_unsettled() {
    let pending = "\
kube-system   helm-install-rke2-ingress-nginx-9zzkq    1/1   Running     0     1m    10.42.0.9    server-0   <none>   <none>
";
    let exec = ScriptedExecutor::new().local("get pods", pending);
    let reporter = RecordingReporter::default();
    let budgets = fast_budgets();
    let env = ScenarioEnv::new(&exec, &reporter, &budgets);

    let err = readiness::pods_settled(&env, Path::new(KUBECONFIG), PollBudget::secs(4, 2))
        .await
        .expect_err("helm job must complete");
    assert!(
        format!("{err:#}").contains("helm-install-rke2-ingress-nginx-9zzkq is Running, expected Completed"),
        "{err:#}"
    );
}
