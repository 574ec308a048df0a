//! Cluster lifecycle: create, deploy, restart, stop, start, destroy.
//!
//! Every operation that touches more than one host fans out concurrently and
//! reports failures per host. The [`ClusterHandle`] is updated to reflect the
//! hosts that actually changed state.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::net::Ipv4Addr;

use anyhow::{Context, Result};

use crate::application::poll::eventually;
use crate::application::ports::{ClusterProvisioner, KubeconfigStore, ProgressReporter, RemoteExecutor};
use crate::application::services::fanout::{fan_out, run_on_each};
use crate::domain::{
    ClusterHandle, HarnessConfig, Host, HostRole, ProvisioningError, ServiceState,
    Workload,
};

const KUBECONFIG_SOURCE: &str = "sudo cat /etc/rancher/rke2/rke2.yaml";
const LOOPBACK: &str = "127.0.0.1";
const EXTERNAL_IP_COMMAND: &str = "ip -f inet addr show eth1| awk '/inet / {print $2}'|cut -d/ -f1";
const RESTART_COMMAND: &str = "sudo systemctl restart rke2-*";
const STOP_COMMAND: &str = "sudo systemctl stop rke2-*";
const ROTATE_COMMAND: &str = "sudo rke2 certificate rotate";

/// `systemctl start` for the unit matching `role`.
#[must_use]
pub fn start_command(role: HostRole) -> String {
    format!("sudo systemctl start {}", role.service_unit())
}

/// Start a server without waiting for it to report ready.
#[must_use]
pub fn seed_start_command() -> String {
    format!("sudo systemctl --no-block start {}", HostRole::Server.service_unit())
}

// ── Creation ──────────────────────────────────────────────────────────────────

/// Provision the cluster described by `config` and wait for its first server
/// to hand out a kubeconfig.
///
/// # Errors
///
/// Returns [`ProvisioningError`] (fatal to the run) if the provisioner fails
/// or the first server never answers within the `first_server` budget.
pub async fn create(
    provisioner: &impl ClusterProvisioner,
    exec: &impl RemoteExecutor,
    store: &impl KubeconfigStore,
    reporter: &impl ProgressReporter,
    config: &HarnessConfig,
) -> Result<ClusterHandle> {
    let spec = &config.cluster;
    let mut handle = ClusterHandle::new(
        spec.server_count,
        spec.agent_count,
        config.paths.workload_dir.clone(),
    );
    let hosts = handle.all_hosts();

    reporter.step(&format!(
        "provisioning {} servers and {} agents ({})",
        spec.server_count, spec.agent_count, spec.node_os
    ));
    if let Err(err) = provisioner.provision(spec, &hosts).await {
        tracing::error!(error = %format!("{err:#}"), "provisioning failed");
        return Err(ProvisioningError {
            reason: format!("{err:#}"),
            log: provisioner.log_tail().await,
        }
        .into());
    }
    handle.mark_provisioned()?;
    reporter.success(&handle.summary());

    let server = handle.first_server()?.clone();
    reporter.step(&format!("waiting for {server} to serve a kubeconfig"));
    let contents = eventually(config.budgets.first_server, || generate_kubeconfig(exec, &server))
        .await
        .map_err(|err| ProvisioningError {
            reason: format!("{server} never became reachable: {err:#}"),
            log: None,
        })?;
    let path = store
        .write(&server, &contents)
        .context("writing kubeconfig")?;
    handle.mark_running(path)?;
    tracing::info!(state = handle.state().as_str(), "cluster is up");
    Ok(handle)
}

/// Read the server's kubeconfig and point it at the server's external IP.
///
/// # Errors
///
/// Returns an error if either command fails or the result is not a usable
/// kubeconfig.
pub async fn generate_kubeconfig(exec: &impl RemoteExecutor, server: &Host) -> Result<String> {
    let raw = exec.run_on_host(server, KUBECONFIG_SOURCE).await?;
    let ip = fetch_node_external_ip(exec, server).await?;
    rewrite_kubeconfig(&raw, &ip)
}

/// Replace the first loopback address with `ip` and check the result still
/// describes at least one cluster.
///
/// # Errors
///
/// Returns an error if the text has no loopback address, is not YAML, or has
/// no `clusters` entry.
pub fn rewrite_kubeconfig(raw: &str, ip: &str) -> Result<String> {
    anyhow::ensure!(
        raw.contains(LOOPBACK),
        "kubeconfig does not reference {LOOPBACK}"
    );
    let rewritten = raw.replacen(LOOPBACK, ip, 1);
    let doc: serde_yaml::Value =
        serde_yaml::from_str(&rewritten).context("kubeconfig is not valid YAML")?;
    let has_clusters = doc
        .get("clusters")
        .and_then(serde_yaml::Value::as_sequence)
        .is_some_and(|c| !c.is_empty());
    anyhow::ensure!(has_clusters, "kubeconfig has no clusters entry");
    Ok(rewritten)
}

/// IPv4 address of the host's external interface.
///
/// # Errors
///
/// Returns an error if the command fails or prints something that is not an
/// IPv4 address.
pub async fn fetch_node_external_ip(exec: &impl RemoteExecutor, host: &Host) -> Result<String> {
    let output = exec.run_on_host(host, EXTERNAL_IP_COMMAND).await?;
    let ip = output.trim();
    ip.parse::<Ipv4Addr>()
        .with_context(|| format!("{host} reported external IP {ip:?}"))?;
    Ok(ip.to_string())
}

// ── Workloads ─────────────────────────────────────────────────────────────────

/// `kubectl apply` a manifest from the workload directory.
///
/// Applying an unchanged manifest again succeeds.
///
/// # Errors
///
/// Returns an error if no kubeconfig exists yet or the apply fails.
pub async fn deploy_workload(
    exec: &impl RemoteExecutor,
    handle: &ClusterHandle,
    workload: Workload,
) -> Result<String> {
    let manifest = handle.workload_dir().join(workload.manifest());
    let command = format!(
        "kubectl apply -f {} --kubeconfig={}",
        manifest.display(),
        handle.kubeconfig()?.display()
    );
    exec.run_local(&command)
        .await
        .with_context(|| format!("deploying {workload}"))
}

// ── Service control ───────────────────────────────────────────────────────────

/// Restart the cluster service on every host in `hosts` and wait for each
/// unit to come back. Does not wait for the cluster to converge.
///
/// # Errors
///
/// Returns a [`crate::domain::FanOutError`] naming every host that failed.
pub async fn restart(
    exec: &impl RemoteExecutor,
    handle: &mut ClusterHandle,
    hosts: &[Host],
) -> Result<()> {
    handle.begin_restart(hosts)?;
    let report = run_on_each(exec, hosts, RESTART_COMMAND).await;
    handle.finish_restart(&report.succeeded())?;
    report.into_result().map(drop)
}

/// Stop the cluster service on every host in `hosts`.
///
/// # Errors
///
/// Returns a [`crate::domain::FanOutError`] naming every host that failed.
pub async fn stop(
    exec: &impl RemoteExecutor,
    handle: &mut ClusterHandle,
    hosts: &[Host],
) -> Result<()> {
    handle.check_service_control(hosts, "stop")?;
    let report = run_on_each(exec, hosts, STOP_COMMAND).await;
    handle.record_services(&report.succeeded(), ServiceState::Stopped);
    report.into_result().map(drop)
}

/// Start the cluster service on every host in `hosts`, each with its
/// role's unit.
///
/// # Errors
///
/// Returns a [`crate::domain::FanOutError`] naming every host that failed.
pub async fn start(
    exec: &impl RemoteExecutor,
    handle: &mut ClusterHandle,
    hosts: &[Host],
) -> Result<()> {
    handle.check_service_control(hosts, "start")?;
    let report = fan_out("start", hosts, |host| {
        let command = start_command(host.role());
        async move { exec.run_on_host(host, &command).await }
    })
    .await;
    handle.record_services(&report.succeeded(), ServiceState::Running);
    report.into_result().map(drop)
}

/// Start a fully stopped set of servers without deadlocking on quorum.
///
/// The first server is started with `--no-block` so it can wait for peers in
/// the background; only then are the remaining servers started.
///
/// # Errors
///
/// Returns an error if the seed start fails (nothing else is attempted) or
/// if any remaining server fails to start.
pub async fn start_quorum_safe(
    exec: &impl RemoteExecutor,
    handle: &mut ClusterHandle,
    servers: &[Host],
) -> Result<()> {
    let Some((seed, rest)) = servers.split_first() else {
        return Ok(());
    };
    handle.check_service_control(servers, "start")?;
    exec.run_on_host(seed, &seed_start_command())
        .await
        .with_context(|| format!("seeding quorum on {seed}"))?;
    handle.record_services(std::slice::from_ref(seed), ServiceState::Running);
    start(exec, handle, rest).await
}

/// Rotate certificates on every host in `servers`.
///
/// # Errors
///
/// Refuses to run while any server of the cluster is still running, and
/// returns a [`crate::domain::FanOutError`] naming every host that failed.
pub async fn rotate_certificates(
    exec: &impl RemoteExecutor,
    handle: &ClusterHandle,
    servers: &[Host],
) -> Result<()> {
    handle.check_service_control(servers, "rotate certificates")?;
    if let Some(running) = handle
        .servers()
        .iter()
        .find(|s| handle.service_state(s) != Some(ServiceState::Stopped))
    {
        anyhow::bail!("cannot rotate certificates while {running} is still running");
    }
    run_on_each(exec, servers, ROTATE_COMMAND)
        .await
        .into_result()
        .map(drop)
}

// ── Teardown ──────────────────────────────────────────────────────────────────

/// Destroy every host and remove the generated kubeconfig.
///
/// # Errors
///
/// Returns an error if the handle was already destroyed, the provisioner
/// fails, or the kubeconfig cannot be removed.
pub async fn destroy(
    provisioner: &impl ClusterProvisioner,
    store: &impl KubeconfigStore,
    handle: &mut ClusterHandle,
) -> Result<()> {
    let kubeconfig = handle.mark_destroyed()?;
    provisioner.destroy().await.map_err(|err| ProvisioningError {
        reason: format!("destroy: {err:#}"),
        log: None,
    })?;
    if let Some(path) = kubeconfig {
        store.remove(&path)?;
    }
    Ok(())
}
