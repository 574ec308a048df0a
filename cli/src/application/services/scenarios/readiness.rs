//! Node and pod readiness.

use std::path::Path;

use anyhow::Result;

use super::ScenarioEnv;
use crate::application::poll::eventually_all;
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::state::{parse_nodes, parse_pods};
use crate::domain::{ClusterHandle, Node, Pod, PollBudget};

/// Wait until every node reports `Ready`.
///
/// # Errors
///
/// On timeout, lists every node that was still not ready at the last poll.
pub async fn nodes_ready<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    kubeconfig: &Path,
    budget: PollBudget,
) -> Result<Vec<Node>> {
    let (exec, reporter) = (env.exec, env.reporter);
    eventually_all(
        budget,
        || parse_nodes(exec, reporter, kubeconfig, false),
        Node::ensure_ready,
    )
    .await
}

/// Wait until every pod has settled (helm installs `Completed`, everything
/// else `Running`).
///
/// # Errors
///
/// On timeout, lists every pod that had not settled at the last poll.
pub async fn pods_settled<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    kubeconfig: &Path,
    budget: PollBudget,
) -> Result<Vec<Pod>> {
    let (exec, reporter) = (env.exec, env.reporter);
    eventually_all(
        budget,
        || parse_pods(exec, reporter, kubeconfig, false),
        Pod::ensure_settled,
    )
    .await
}

/// Every node Ready, then print the node table.
///
/// # Errors
///
/// See [`nodes_ready`].
pub async fn check_node_status<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    let kubeconfig = handle.kubeconfig()?;
    nodes_ready(env, kubeconfig, env.budgets.readiness).await?;
    parse_nodes(env.exec, env.reporter, kubeconfig, true).await?;
    Ok(())
}

/// Every pod settled, then print the pod table.
///
/// # Errors
///
/// See [`pods_settled`].
pub async fn check_pod_status<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    let kubeconfig = handle.kubeconfig()?;
    pods_settled(env, kubeconfig, env.budgets.readiness).await?;
    parse_pods(env.exec, env.reporter, kubeconfig, true).await?;
    Ok(())
}
