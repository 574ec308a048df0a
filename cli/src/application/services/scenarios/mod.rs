//! Scenario bodies. Each one composes lifecycle operations, state parsers and
//! polling into a single pass/fail verdict.
//!
//! Cluster creation is not dispatched from here: it produces the handle every
//! other scenario works on, so the sequencer runs it itself.
//!
//! Imports only from `crate::domain`, `crate::application::ports` and sibling
//! application modules.

pub mod exposure;
pub mod readiness;
pub mod resilience;
pub mod workloads;

use std::path::Path;

use anyhow::Result;

use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::domain::{Budgets, ClusterHandle, Scenario};

/// Collaborators shared by every scenario.
pub struct ScenarioEnv<'a, E, R> {
    pub exec: &'a E,
    pub reporter: &'a R,
    pub budgets: &'a Budgets,
}

impl<'a, E: RemoteExecutor, R: ProgressReporter> ScenarioEnv<'a, E, R> {
    pub fn new(exec: &'a E, reporter: &'a R, budgets: &'a Budgets) -> Self {
        Self {
            exec,
            reporter,
            budgets,
        }
    }
}

/// Run one scenario against an existing cluster.
///
/// # Errors
///
/// Returns the first assertion, transport, parse or convergence failure.
pub async fn run<E: RemoteExecutor, R: ProgressReporter>(
    scenario: Scenario,
    env: &ScenarioEnv<'_, E, R>,
    handle: &mut ClusterHandle,
) -> Result<()> {
    match scenario {
        Scenario::CreateCluster => anyhow::bail!("cluster creation is run by the sequencer"),
        Scenario::NodeStatus => readiness::check_node_status(env, handle).await,
        Scenario::PodStatus => readiness::check_pod_status(env, handle).await,
        Scenario::ClusterIpService => exposure::cluster_ip_service(env, handle).await,
        Scenario::NodePortService => exposure::node_port_service(env, handle).await,
        Scenario::LoadBalancerService => exposure::load_balancer_service(env, handle).await,
        Scenario::Ingress => exposure::ingress(env, handle).await,
        Scenario::DaemonSet => workloads::daemonset(env, handle).await,
        Scenario::DnsAccess => workloads::dns_access(env, handle).await,
        Scenario::LocalPathStorage => workloads::local_path_storage(env, handle).await,
        Scenario::ClusterRestart => resilience::cluster_restart(env, handle).await,
        Scenario::StopAndRotateCertificates => {
            resilience::stop_and_rotate_certificates(env, handle).await
        }
        Scenario::StartAfterRotation => resilience::start_after_rotation(env, handle).await,
        Scenario::ValidateCertificates => resilience::validate_certificates(env, handle).await,
    }
}

/// `kubectl <args> --kubeconfig=<path>`.
pub(crate) fn kubectl(kubeconfig: &Path, args: &str) -> String {
    format!("kubectl {args} --kubeconfig={}", kubeconfig.display())
}
