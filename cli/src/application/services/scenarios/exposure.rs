//! Service exposure: ClusterIP, NodePort, LoadBalancer and Ingress.
//!
//! Every workload serves its marker string at `/name.html`; a probe passes
//! once the marker comes back.

use std::path::Path;

use anyhow::{Context, Result};

use super::{ScenarioEnv, kubectl};
use crate::application::poll::{Expect, eventually_output};
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::cluster::{deploy_workload, fetch_node_external_ip};
use crate::domain::{ClusterHandle, PollBudget, Workload};

const INGRESS_HOST: &str = "foo1.bar.com";

/// Names of the workload's pods that are in phase Running.
///
/// # Errors
///
/// Returns an error for a workload without an app label.
pub fn running_pods_command(workload: Workload, kubeconfig: &Path) -> Result<String> {
    let label = workload
        .app_label()
        .with_context(|| format!("{workload} has no app label"))?;
    Ok(kubectl(
        kubeconfig,
        &format!("get pods -o=name -l k8s-app={label} --field-selector=status.phase=Running"),
    ))
}

/// One field of a service, selected by jsonpath.
#[must_use]
pub fn service_field_command(service: &str, jsonpath: &str, kubeconfig: &Path) -> String {
    format!(
        "kubectl get service {service} --kubeconfig={} --output jsonpath=\"{{{jsonpath}}}\"",
        kubeconfig.display()
    )
}

#[must_use]
pub fn curl_command(address: &str) -> String {
    format!("curl -L --insecure http://{address}/name.html")
}

async fn service_field(
    exec: &impl RemoteExecutor,
    workload: Workload,
    jsonpath: &str,
    kubeconfig: &Path,
) -> Result<String> {
    let service = workload
        .service()
        .with_context(|| format!("{workload} has no service"))?;
    let output = exec
        .run_local(&service_field_command(service, jsonpath, kubeconfig))
        .await?;
    let value = output.trim().trim_matches('"').to_string();
    anyhow::ensure!(!value.is_empty(), "service {service} has no {jsonpath}");
    Ok(value)
}

/// Wait until at least one pod of `workload` is Running.
async fn wait_for_pods<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    workload: Workload,
    kubeconfig: &Path,
    budget: PollBudget,
) -> Result<()> {
    let command = running_pods_command(workload, kubeconfig)?;
    let exec = env.exec;
    eventually_output(
        budget,
        || exec.run_local(&command),
        &Expect::contains(workload.marker()),
    )
    .await
    .with_context(|| format!("{workload} pods never reached Running"))?;
    Ok(())
}

/// ClusterIP: pods Running, then the cluster IP answers from every server.
///
/// # Errors
///
/// Returns the first probe that did not converge.
pub async fn cluster_ip_service<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    let workload = Workload::ClusterIp;
    deploy_workload(env.exec, handle, workload).await?;
    let kubeconfig = handle.kubeconfig()?;
    wait_for_pods(env, workload, kubeconfig, env.budgets.rollout).await?;

    let cluster_ip = service_field(env.exec, workload, ".spec.clusterIP", kubeconfig).await?;
    let command = curl_command(&cluster_ip);
    let expect = Expect::contains(workload.marker());
    for server in handle.servers() {
        eventually_output(env.budgets.rollout, || env.exec.run_on_host(server, &command), &expect)
            .await
            .with_context(|| format!("cluster IP unreachable from {server}"))?;
    }
    Ok(())
}

/// NodePort: from every server's external IP, the node port answers.
///
/// # Errors
///
/// Returns the first probe that did not converge.
pub async fn node_port_service<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    let workload = Workload::NodePort;
    deploy_workload(env.exec, handle, workload).await?;
    let kubeconfig = handle.kubeconfig()?;
    let expect = Expect::contains(workload.marker());

    for server in handle.servers() {
        let ip = fetch_node_external_ip(env.exec, server).await?;
        let port = service_field(env.exec, workload, ".spec.ports[0].nodePort", kubeconfig).await?;
        wait_for_pods(env, workload, kubeconfig, env.budgets.node_port_pods).await?;
        let command = curl_command(&format!("{ip}:{port}"));
        eventually_output(env.budgets.node_port_curl, || env.exec.run_local(&command), &expect)
            .await
            .with_context(|| format!("node port unreachable on {server} ({ip}:{port})"))?;
    }
    Ok(())
}

/// LoadBalancer: the service port answers on the first server.
///
/// # Errors
///
/// Returns the first probe that did not converge.
pub async fn load_balancer_service<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    let workload = Workload::LoadBalancer;
    deploy_workload(env.exec, handle, workload).await?;
    let kubeconfig = handle.kubeconfig()?;
    let ip = fetch_node_external_ip(env.exec, handle.first_server()?).await?;
    let port = service_field(env.exec, workload, ".spec.ports[0].port", kubeconfig).await?;
    wait_for_pods(env, workload, kubeconfig, env.budgets.rollout).await?;

    let command = curl_command(&format!("{ip}:{port}"));
    eventually_output(
        env.budgets.rollout,
        || env.exec.run_local(&command),
        &Expect::contains(workload.marker()),
    )
    .await
    .with_context(|| format!("load balancer unreachable at {ip}:{port}"))?;
    Ok(())
}

/// Ingress: every server routes the test host name to the backend.
///
/// # Errors
///
/// Returns the first probe that did not converge.
pub async fn ingress<E: RemoteExecutor, R: ProgressReporter>(
    env: &ScenarioEnv<'_, E, R>,
    handle: &ClusterHandle,
) -> Result<()> {
    let workload = Workload::Ingress;
    deploy_workload(env.exec, handle, workload).await?;
    let expect = Expect::contains(workload.marker());
    for server in handle.servers() {
        let ip = fetch_node_external_ip(env.exec, server).await?;
        let command = format!("curl --header host:{INGRESS_HOST} http://{ip}/name.html");
        eventually_output(env.budgets.rollout, || env.exec.run_local(&command), &expect)
            .await
            .with_context(|| format!("ingress not serving on {server}"))?;
    }
    Ok(())
}
