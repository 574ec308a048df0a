//! Full restart and certificate rotation.

use anyhow::{Context, Result};

use super::ScenarioEnv;
use super::readiness::{nodes_ready, pods_settled};
use super::workloads::daemonset_running;
use crate::application::poll::{all_satisfy, eventually};
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::cluster::{
    restart, rotate_certificates, start_quorum_safe, stop,
};
use crate::application::services::state::{parse_nodes, parse_pods};
use crate::domain::certs::{
    PRESERVED_FILES, compare_file_sets, identical_files_command, list_rotated_dirs_command,
    newest_rotated_dir,
};
use crate::domain::{ClusterHandle, Host, Node};

/// Restart every host, then wait for nodes Ready and the daemon set running
/// on every node again.
///
/// # Errors
///
/// Returns the restart fan-out failure, or the last mismatch on timeout.
pub async fn cluster_restart<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &mut ClusterHandle,
) -> Result<()> {
    let hosts = handle.all_hosts();
    restart(env.exec, handle, &hosts)
        .await
        .context("restarting cluster")?;

    let kubeconfig = handle.kubeconfig()?;
    let (exec, reporter) = (env.exec, env.reporter);
    eventually(env.budgets.cluster_restart, || async move {
        let nodes = parse_nodes(exec, reporter, kubeconfig, false).await?;
        all_satisfy(&nodes, Node::ensure_ready)?;
        let pods = parse_pods(exec, reporter, kubeconfig, false).await?;
        daemonset_running(&pods, nodes.len())
    })
    .await
}

/// Stop every server, then rotate certificates on each.
///
/// # Errors
///
/// Rotation is not attempted unless every server stopped.
pub async fn stop_and_rotate_certificates<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &mut ClusterHandle,
) -> Result<()> {
    let servers = handle.servers().to_vec();
    stop(env.exec, handle, &servers)
        .await
        .context("stopping servers")?;
    rotate_certificates(env.exec, handle, &servers)
        .await
        .context("rotating certificates")
}

/// Bring the stopped servers back with quorum seeding, then wait for the
/// cluster to settle.
///
/// # Errors
///
/// Returns the start failure, or the last mismatch on timeout.
pub async fn start_after_rotation<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &mut ClusterHandle,
) -> Result<()> {
    let servers = handle.servers().to_vec();
    start_quorum_safe(env.exec, handle, &servers)
        .await
        .context("starting servers")?;

    let kubeconfig = handle.kubeconfig()?;
    nodes_ready(env, kubeconfig, env.budgets.cluster_restart).await?;
    pods_settled(env, kubeconfig, env.budgets.cluster_restart).await?;
    Ok(())
}

/// On every server, the CA and service-account material must be identical
/// between the live and the newest rotated certificate directory. Agents are
/// restarted to pick up the rotated certificates before the verdict.
///
/// # Errors
///
/// Returns every server whose identical-file set is wrong.
pub async fn validate_certificates<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &mut ClusterHandle,
) -> Result<()> {
    let mut mismatches = Vec::new();
    for server in handle.servers() {
        if let Some(problem) = check_server_certificates(env, server).await? {
            mismatches.push(problem);
        }
    }

    let agents = handle.agents().to_vec();
    restart(env.exec, handle, &agents)
        .await
        .context("restarting agents")?;

    anyhow::ensure!(mismatches.is_empty(), "{}", mismatches.join("; "));
    Ok(())
}

/// `Ok(None)` when the server's identical files are exactly the preserved set.
async fn check_server_certificates<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    server: &Host,
) -> Result<Option<String>> {
    let listing = env
        .exec
        .run_on_host(server, &list_rotated_dirs_command())
        .await?;
    let rotated = newest_rotated_dir(&listing)
        .with_context(|| format!("{server} has no rotated certificate directory"))?;
    let identical = env
        .exec
        .run_on_host(server, &identical_files_command(rotated))
        .await?;

    let diff = compare_file_sets(&identical, PRESERVED_FILES);
    if !diff.duplicates.is_empty() {
        env.reporter.warn(&format!(
            "{server}: diff listed {} more than once",
            diff.duplicates.join(", ")
        ));
    }
    if diff.is_match() {
        return Ok(None);
    }
    Ok(Some(format!(
        "{server}: missing [{}], unexpected [{}]",
        diff.missing.join(", "),
        diff.unexpected.join(", ")
    )))
}
