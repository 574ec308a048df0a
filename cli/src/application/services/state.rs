//! Cluster state snapshots: `get nodes` and `get pods` as typed records.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::domain::{Node, Pod, parse_node_table, parse_pod_table};

/// `kubectl get nodes` across all namespaces, wide, without headers.
#[must_use]
pub fn nodes_command(kubeconfig: &Path) -> String {
    format!(
        "kubectl get nodes --no-headers -o wide -A --kubeconfig={}",
        kubeconfig.display()
    )
}

/// `kubectl get pods` across all namespaces, wide, without headers.
#[must_use]
pub fn pods_command(kubeconfig: &Path) -> String {
    format!(
        "kubectl get pods --no-headers -o wide -A --kubeconfig={}",
        kubeconfig.display()
    )
}

/// Fetch and parse the node list, in the order the API server returned it.
///
/// With `print`, the raw table is also dumped through `reporter`; the
/// returned nodes are the same either way.
///
/// # Errors
///
/// Returns a transport error if the command fails, or a parse error for the
/// first row that cannot be interpreted.
pub async fn parse_nodes(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    kubeconfig: &Path,
    print: bool,
) -> Result<Vec<Node>> {
    let command = nodes_command(kubeconfig);
    let output = exec.run_local(&command).await?;
    let nodes = parse_node_table(&output).with_context(|| format!("parsing output of `{command}`"))?;
    if print {
        reporter.dump("Nodes", output.trim_end());
    }
    Ok(nodes)
}

/// Fetch and parse the pod list across all namespaces, in output order.
///
/// # Errors
///
/// See [`parse_nodes`].
pub async fn parse_pods(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    kubeconfig: &Path,
    print: bool,
) -> Result<Vec<Pod>> {
    let command = pods_command(kubeconfig);
    let output = exec.run_local(&command).await?;
    let pods = parse_pod_table(&output).with_context(|| format!("parsing output of `{command}`"))?;
    if print {
        reporter.dump("Pods", output.trim_end());
    }
    Ok(pods)
}
