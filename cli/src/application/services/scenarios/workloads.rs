//! Daemon-set coverage, in-cluster DNS and local-path storage persistence.

use anyhow::{Context, Result};

use super::{ScenarioEnv, kubectl};
use crate::application::poll::{Expect, eventually, eventually_output};
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::cluster::deploy_workload;
use crate::application::services::state::{parse_nodes, parse_pods};
use crate::domain::{ClusterHandle, Pod, Workload, count_named};

const DNS_ANSWER: &str = "kubernetes.default.svc.cluster.local";
const VOLUME_CLAIM_BOUND: &str = r"local-path-pvc.+Bound";
const VOLUME_POD_RUNNING: &str = r"volume-test.+Running";
const VOLUME_PAYLOAD: &str = "local-path-test";

/// Exactly one daemon-set pod per node.
///
/// # Errors
///
/// Returns a mismatch naming both counts.
pub fn daemonset_covers(pods: &[Pod], node_count: usize) -> Result<()> {
    let count = count_named(pods, Workload::DaemonSet.marker());
    anyhow::ensure!(
        count == node_count,
        "found {count} daemonset pods for {node_count} nodes"
    );
    Ok(())
}

/// One daemon-set pod per node, and every one Running and fully ready.
///
/// # Errors
///
/// Returns a mismatch naming the pods that are not yet running.
pub fn daemonset_running(pods: &[Pod], node_count: usize) -> Result<()> {
    daemonset_covers(pods, node_count)?;
    let lagging: Vec<String> = pods
        .iter()
        .filter(|p| p.name.contains(Workload::DaemonSet.marker()) && !p.is_running_and_ready())
        .map(|p| format!("{} ({} {})", p.name, p.status, p.ready))
        .collect();
    anyhow::ensure!(
        lagging.is_empty(),
        "daemonset pods not running: {}",
        lagging.join(", ")
    );
    Ok(())
}

/// Deploy the daemon set and wait for one pod per node.
///
/// # Errors
///
/// Returns the last count mismatch on timeout.
pub async fn daemonset<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    deploy_workload(env.exec, handle, Workload::DaemonSet).await?;
    let kubeconfig = handle.kubeconfig()?;
    let (exec, reporter) = (env.exec, env.reporter);
    let node_count = parse_nodes(exec, reporter, kubeconfig, false).await?.len();

    eventually(env.budgets.daemonset, || async move {
        let pods = parse_pods(exec, reporter, kubeconfig, false).await?;
        daemonset_covers(&pods, node_count)
    })
    .await
}

/// `kubernetes.default` resolves from inside a pod.
///
/// # Errors
///
/// Returns the last lookup output on timeout.
pub async fn dns_access<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    deploy_workload(env.exec, handle, Workload::DnsUtils).await?;
    let kubeconfig = handle.kubeconfig()?;
    let command = format!(
        "kubectl --kubeconfig={} exec -i -t dnsutils -- nslookup kubernetes.default",
        kubeconfig.display()
    );
    eventually_output(
        env.budgets.dns,
        || env.exec.run_local(&command),
        &Expect::contains(DNS_ANSWER),
    )
    .await?;
    Ok(())
}

/// Data written to a local-path volume survives the pod being deleted and
/// recreated.
///
/// # Errors
///
/// Returns the first step that failed or did not converge.
pub async fn local_path_storage<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    let workload = Workload::LocalPathProvisioner;
    let exec = env.exec;
    deploy_workload(exec, handle, workload).await?;
    let kubeconfig = handle.kubeconfig()?;

    let claim = kubectl(kubeconfig, "get pvc local-path-pvc");
    eventually_output(
        env.budgets.volume_claim,
        || exec.run_local(&claim),
        &Expect::matches(VOLUME_CLAIM_BOUND)?,
    )
    .await
    .context("volume claim never bound")?;

    let pod = kubectl(kubeconfig, "get pod volume-test");
    eventually_output(
        env.budgets.volume_pod,
        || exec.run_local(&pod),
        &Expect::matches(VOLUME_POD_RUNNING)?,
    )
    .await
    .context("volume-test pod never ran")?;

    let write = format!(
        "kubectl --kubeconfig={} exec volume-test -- sh -c 'echo {VOLUME_PAYLOAD} > /data/test'",
        kubeconfig.display()
    );
    exec.run_local(&write).await?;
    exec.run_local(&kubectl(kubeconfig, "delete pod volume-test"))
        .await?;
    deploy_workload(exec, handle, workload)
        .await
        .context("re-attaching volume")?;

    let read = kubectl(kubeconfig, "exec volume-test -- cat /data/test");
    eventually_output(
        env.budgets.volume_read,
        || exec.run_local(&read),
        &Expect::contains(VOLUME_PAYLOAD),
    )
    .await
    .context("volume data did not survive pod recreation")?;
    Ok(())
}
