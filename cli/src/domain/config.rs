//! Domain types and validators for harness configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_NODE_OS: &str = "bento/ubuntu-24.04";
pub const VALID_CNIS: &[&str] = &["canal", "cilium", "calico"];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration, optionally loaded from `~/.clustervet/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    pub cluster: ClusterConfig,
    pub paths: PathsConfig,
    pub budgets: Budgets,
    /// Preserve nothing on failure; always tear down.
    pub ci: bool,
}

/// Shape of the cluster to provision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Vagrant box, e.g. `bento/ubuntu-24.04` or `opensuse/Leap-15.6.x86_64`.
    pub node_os: String,
    pub server_count: usize,
    pub agent_count: usize,
    /// Exported to the provisioner as `E2E_CNI`.
    pub cni: Option<String>,
    /// Exported to the provisioner as `E2E_RELEASE_VERSION`.
    pub release_version: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_os: DEFAULT_NODE_OS.to_string(),
            server_count: 3,
            agent_count: 1,
            cni: None,
            release_version: None,
        }
    }
}

/// Where the harness finds and leaves things on the local machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the `Vagrantfile`.
    pub vagrant_dir: PathBuf,
    /// Directory holding the workload manifests.
    pub workload_dir: PathBuf,
    /// Directory the generated kubeconfig is written to.
    pub kubeconfig_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            vagrant_dir: PathBuf::from("."),
            workload_dir: PathBuf::from("../resource_files"),
            kubeconfig_dir: PathBuf::from("."),
        }
    }
}

/// How long to wait for one convergence, and how often to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollBudget {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl PollBudget {
    #[must_use]
    pub const fn secs(timeout_secs: u64, interval_secs: u64) -> Self {
        Self {
            timeout_secs,
            interval_secs,
        }
    }

    #[must_use]
    pub fn timeout(self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn interval(self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn is_valid(self) -> bool {
        self.interval_secs > 0 && self.interval_secs <= self.timeout_secs
    }
}

/// Per-operation polling budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    /// First server answering with a kubeconfig.
    pub first_server: PollBudget,
    /// Every node Ready / every pod settled after creation.
    pub readiness: PollBudget,
    /// Workload pods reaching Running and answering curl.
    pub rollout: PollBudget,
    /// Node port answering curl from each server.
    pub node_port_curl: PollBudget,
    /// Node port pods reaching Running.
    pub node_port_pods: PollBudget,
    /// One daemon-set pod per node.
    pub daemonset: PollBudget,
    /// In-cluster DNS lookup.
    pub dns: PollBudget,
    /// Volume claim bound.
    pub volume_claim: PollBudget,
    /// Volume test pod running.
    pub volume_pod: PollBudget,
    /// Data readable after the volume is re-attached.
    pub volume_read: PollBudget,
    /// Full convergence after restarts and certificate rotation.
    pub cluster_restart: PollBudget,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            first_server: PollBudget::secs(300, 5),
            readiness: PollBudget::secs(420, 5),
            rollout: PollBudget::secs(240, 5),
            node_port_curl: PollBudget::secs(5, 1),
            node_port_pods: PollBudget::secs(120, 5),
            daemonset: PollBudget::secs(240, 10),
            dns: PollBudget::secs(120, 2),
            volume_claim: PollBudget::secs(120, 2),
            volume_pod: PollBudget::secs(420, 2),
            volume_read: PollBudget::secs(180, 2),
            cluster_restart: PollBudget::secs(1120, 5),
        }
    }
}

impl Budgets {
    fn named(&self) -> [(&'static str, PollBudget); 11] {
        [
            ("first_server", self.first_server),
            ("readiness", self.readiness),
            ("rollout", self.rollout),
            ("node_port_curl", self.node_port_curl),
            ("node_port_pods", self.node_port_pods),
            ("daemonset", self.daemonset),
            ("dns", self.dns),
            ("volume_claim", self.volume_claim),
            ("volume_pod", self.volume_pod),
            ("volume_read", self.volume_read),
            ("cluster_restart", self.cluster_restart),
        ]
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration before any host is touched.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found.
pub fn validate_config(config: &HarnessConfig) -> Result<()> {
    let cluster = &config.cluster;
    if cluster.server_count == 0 {
        return Err(ConfigError::NoServers.into());
    }
    if cluster.node_os.trim().is_empty() {
        return Err(ConfigError::EmptyNodeOs.into());
    }
    if let Some(cni) = &cluster.cni
        && !VALID_CNIS.contains(&cni.as_str())
    {
        return Err(ConfigError::InvalidValue {
            key: "cluster.cni".to_string(),
            value: cni.clone(),
            valid: VALID_CNIS.join(", "),
        }
        .into());
    }
    if let Some(version) = &cluster.release_version {
        validate_release_version(version)?;
    }
    if let Some((name, _)) = config.budgets.named().iter().find(|(_, b)| !b.is_valid()) {
        return Err(ConfigError::InvalidBudget { name: *name }.into());
    }
    Ok(())
}

/// Validates a release tag such as `v1.31.1+rke2r1`.
///
/// # Errors
///
/// Returns an error if the tag is not a semantic version.
pub fn validate_release_version(version: &str) -> Result<()> {
    let bare = version.strip_prefix('v').unwrap_or(version);
    if semver::Version::parse(bare).is_err() {
        return Err(ConfigError::InvalidValue {
            key: "cluster.release_version".to_string(),
            value: version.to_string(),
            valid: "a semantic version such as v1.31.1+rke2r1".to_string(),
        }
        .into());
    }
    Ok(())
}
