//! Cluster handle: membership, kubeconfig location and lifecycle state.
//!
//! The handle is a plain value. Every operation that talks to hosts lives in
//! `application::services::cluster`; this module only records what those
//! operations did and rejects transitions that make no sense.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::error::ClusterError;

/// Role a host plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostRole {
    Server,
    Agent,
}

impl HostRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Agent => "agent",
        }
    }

    /// systemd unit running the cluster service for this role.
    #[must_use]
    pub fn service_unit(self) -> &'static str {
        match self {
            Self::Server => "rke2-server",
            Self::Agent => "rke2-agent",
        }
    }
}

/// A provisioned machine. Membership never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Host {
    name: String,
    role: HostRole,
}

impl Host {
    #[must_use]
    pub fn new(role: HostRole, index: usize) -> Self {
        Self {
            name: format!("{}-{index}", role.as_str()),
            role,
        }
    }

    #[must_use]
    pub fn server(index: usize) -> Self {
        Self::new(HostRole::Server, index)
    }

    #[must_use]
    pub fn agent(index: usize) -> Self {
        Self::new(HostRole::Agent, index)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> HostRole {
        self.role
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lifecycle of the whole cluster.
///
/// `Restarting` is only ever held for the duration of a restart call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClusterState {
    Uninitialized,
    Provisioned,
    Running,
    Restarting,
    Stopped,
    Destroyed,
}

impl ClusterState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Provisioned => "provisioned",
            Self::Running => "running",
            Self::Restarting => "restarting",
            Self::Stopped => "stopped",
            Self::Destroyed => "destroyed",
        }
    }
}

/// Per-host service state tracked by stop/start/restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceState {
    Running,
    Stopped,
}

/// In-memory model of the provisioned cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterHandle {
    servers: Vec<Host>,
    agents: Vec<Host>,
    /// Parallel to `servers` then `agents`.
    services: Vec<ServiceState>,
    kubeconfig: Option<PathBuf>,
    workload_dir: PathBuf,
    state: ClusterState,
}

impl ClusterHandle {
    /// Describe a cluster of `server_count` servers and `agent_count` agents
    /// that has not been provisioned yet.
    #[must_use]
    pub fn new(server_count: usize, agent_count: usize, workload_dir: PathBuf) -> Self {
        let servers: Vec<Host> = (0..server_count).map(Host::server).collect();
        let agents: Vec<Host> = (0..agent_count).map(Host::agent).collect();
        let services = vec![ServiceState::Stopped; servers.len() + agents.len()];
        Self {
            servers,
            agents,
            services,
            kubeconfig: None,
            workload_dir,
            state: ClusterState::Uninitialized,
        }
    }

    #[must_use]
    pub fn servers(&self) -> &[Host] {
        &self.servers
    }

    #[must_use]
    pub fn agents(&self) -> &[Host] {
        &self.agents
    }

    /// Servers followed by agents.
    #[must_use]
    pub fn all_hosts(&self) -> Vec<Host> {
        self.servers.iter().chain(&self.agents).cloned().collect()
    }

    /// The server used to bootstrap the kubeconfig and seed quorum.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NoServers`] for a server-less cluster.
    pub fn first_server(&self) -> Result<&Host, ClusterError> {
        self.servers.first().ok_or(ClusterError::NoServers)
    }

    #[must_use]
    pub fn state(&self) -> ClusterState {
        self.state
    }

    #[must_use]
    pub fn workload_dir(&self) -> &Path {
        &self.workload_dir
    }

    /// Path of the generated kubeconfig.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::MissingKubeconfig`] before the first server
    /// has answered.
    pub fn kubeconfig(&self) -> Result<&Path, ClusterError> {
        self.kubeconfig
            .as_deref()
            .ok_or(ClusterError::MissingKubeconfig)
    }

    /// Service state of `host`, if it belongs to this cluster.
    #[must_use]
    pub fn service_state(&self, host: &Host) -> Option<ServiceState> {
        self.index_of(host).map(|i| self.services[i])
    }

    /// One-line membership summary used in run banners.
    #[must_use]
    pub fn summary(&self) -> String {
        let names = |hosts: &[Host]| {
            hosts
                .iter()
                .map(Host::name)
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!(
            "Server Nodes: {}  Agent Nodes: {}",
            names(&self.servers),
            names(&self.agents)
        )
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Hosts exist but nobody has confirmed the service is answering.
    ///
    /// # Errors
    ///
    /// Only valid from `Uninitialized`.
    pub fn mark_provisioned(&mut self) -> Result<(), ClusterError> {
        self.require(&[ClusterState::Uninitialized], "provision")?;
        self.state = ClusterState::Provisioned;
        Ok(())
    }

    /// The first server answered and its kubeconfig was written to `path`.
    ///
    /// # Errors
    ///
    /// Only valid from `Provisioned`.
    pub fn mark_running(&mut self, kubeconfig: PathBuf) -> Result<(), ClusterError> {
        self.require(&[ClusterState::Provisioned], "bring up")?;
        self.kubeconfig = Some(kubeconfig);
        self.services.fill(ServiceState::Running);
        self.state = ClusterState::Running;
        Ok(())
    }

    /// Enter the transient restart sub-state.
    ///
    /// # Errors
    ///
    /// Only valid while some hosts are up or all are stopped.
    pub fn begin_restart(&mut self, hosts: &[Host]) -> Result<(), ClusterError> {
        self.require(&[ClusterState::Running, ClusterState::Stopped], "restart")?;
        self.check_members(hosts)?;
        self.state = ClusterState::Restarting;
        Ok(())
    }

    /// Leave the restart sub-state; `restarted` came back up.
    ///
    /// # Errors
    ///
    /// Only valid from `Restarting`.
    pub fn finish_restart(&mut self, restarted: &[Host]) -> Result<(), ClusterError> {
        self.require(&[ClusterState::Restarting], "finish a restart")?;
        self.set_services(restarted, ServiceState::Running);
        self.state = self.derived_state();
        Ok(())
    }

    /// Check that `hosts` may have their service stopped or started.
    ///
    /// # Errors
    ///
    /// Rejects a destroyed or not yet running cluster, and foreign hosts.
    pub fn check_service_control(
        &self,
        hosts: &[Host],
        operation: &'static str,
    ) -> Result<(), ClusterError> {
        self.require(&[ClusterState::Running, ClusterState::Stopped], operation)?;
        self.check_members(hosts)
    }

    /// Record the service state of `hosts` after stop/start.
    pub fn record_services(&mut self, hosts: &[Host], state: ServiceState) {
        self.set_services(hosts, state);
        if matches!(self.state, ClusterState::Running | ClusterState::Stopped) {
            self.state = self.derived_state();
        }
    }

    /// The cluster is gone. Returns the kubeconfig path to clean up, if any.
    ///
    /// # Errors
    ///
    /// A cluster can only be destroyed once.
    pub fn mark_destroyed(&mut self) -> Result<Option<PathBuf>, ClusterError> {
        if self.state == ClusterState::Destroyed {
            return Err(self.invalid("destroy"));
        }
        self.services.fill(ServiceState::Stopped);
        self.state = ClusterState::Destroyed;
        Ok(self.kubeconfig.take())
    }

    // ── Private helpers ──────────────────────────────────────────────────────

    fn require(
        &self,
        allowed: &[ClusterState],
        operation: &'static str,
    ) -> Result<(), ClusterError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> ClusterError {
        ClusterError::InvalidTransition {
            operation,
            state: self.state.as_str(),
        }
    }

    fn index_of(&self, host: &Host) -> Option<usize> {
        self.servers
            .iter()
            .chain(&self.agents)
            .position(|h| h == host)
    }

    fn check_members(&self, hosts: &[Host]) -> Result<(), ClusterError> {
        match hosts.iter().find(|h| self.index_of(h).is_none()) {
            Some(stranger) => Err(ClusterError::UnknownHost(stranger.name().to_string())),
            None => Ok(()),
        }
    }

    fn set_services(&mut self, hosts: &[Host], state: ServiceState) {
        for host in hosts {
            if let Some(i) = self.index_of(host) {
                self.services[i] = state;
            }
        }
    }

    /// Stopped when no server is running, otherwise Running.
    fn derived_state(&self) -> ClusterState {
        let any_server_up = self.services[..self.servers.len()]
            .iter()
            .any(|s| *s == ServiceState::Running);
        if any_server_up {
            ClusterState::Running
        } else {
            ClusterState::Stopped
        }
    }
}
