//! Vagrant implementation of the `ClusterProvisioner` port.
//!
//! `VagrantProvisioner<R>` routes every vagrant call through a
//! `CommandRunner` pinned to the directory holding the `Vagrantfile`.
//! Machines are created without provisioning first, then provisioned
//! concurrently, one `vagrant provision` per host.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::join_all;

use crate::application::ports::{ClusterProvisioner, CommandRunner};
use crate::domain::{ClusterConfig, FanOutError, Host, HostFailure};

/// Log written by `vagrant up`, relative to the Vagrant directory.
pub const VAGRANT_LOG: &str = "vagrant.log";

/// Creating and provisioning a node can take a long while on a cold box cache.
const PROVISION_TIMEOUT: Duration = Duration::from_secs(3600);
const DESTROY_TIMEOUT: Duration = Duration::from_secs(900);
const LOG_TAIL_LINES: usize = 40;

/// Infrastructure adapter that routes all vagrant CLI calls through a
/// `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a recording
/// runner without spawning real processes.
pub struct VagrantProvisioner<R: CommandRunner> {
    runner: R,
    dir: PathBuf,
}

impl<R: CommandRunner> VagrantProvisioner<R> {
    /// `runner` must already run commands from `dir`.
    pub fn new(runner: R, dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            dir: dir.into(),
        }
    }

    async fn provision_host(&self, host: &Host) -> Result<()> {
        let output = self
            .runner
            .run_with_timeout("vagrant", &["provision", host.name()], PROVISION_TIMEOUT)
            .await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("vagrant provision exited with {}: {}", output.status, stderr.trim())
    }
}

/// `vagrant up` command line with the node layout exported as `E2E_*`.
///
/// Other `E2E_*` variables already set in the environment reach the
/// `Vagrantfile` unchanged.
#[must_use]
pub fn up_command(spec: &ClusterConfig, hosts: &[Host]) -> String {
    let roles: Vec<&str> = hosts.iter().map(Host::name).collect();
    let boxes = vec![spec.node_os.as_str(); hosts.len()];
    let mut env = format!(
        "E2E_NODE_ROLES=\"{}\" E2E_NODE_BOXES=\"{}\"",
        roles.join(" "),
        boxes.join(" ")
    );
    if let Some(cni) = &spec.cni {
        env.push_str(&format!(" E2E_CNI={cni}"));
    }
    if let Some(version) = &spec.release_version {
        env.push_str(&format!(" E2E_RELEASE_VERSION={version}"));
    }
    format!("{env} vagrant up --no-provision &> {VAGRANT_LOG}")
}

/// Last `lines` lines of `text`.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

impl<R: CommandRunner> ClusterProvisioner for VagrantProvisioner<R> {
    async fn provision(&self, spec: &ClusterConfig, hosts: &[Host]) -> Result<()> {
        let up = up_command(spec, hosts);
        tracing::info!(command = %up, "creating machines");
        let output = self
            .runner
            .run_with_timeout("bash", &["-c", &up], PROVISION_TIMEOUT)
            .await
            .context("running vagrant up")?;
        anyhow::ensure!(
            output.status.success(),
            "vagrant up exited with {}",
            output.status
        );

        let results = join_all(hosts.iter().map(|h| self.provision_host(h))).await;
        let failures: Vec<HostFailure> = hosts
            .iter()
            .zip(results)
            .filter_map(|(host, r)| {
                r.err().map(|err| HostFailure {
                    host: host.name().to_string(),
                    error: format!("{err:#}"),
                })
            })
            .collect();
        if failures.is_empty() {
            return Ok(());
        }
        Err(FanOutError {
            operation: "vagrant provision".to_string(),
            failed: failures.len(),
            total: hosts.len(),
            failures,
        }
        .into())
    }

    async fn destroy(&self) -> Result<()> {
        let output = self
            .runner
            .run_with_timeout("vagrant", &["destroy", "-f"], DESTROY_TIMEOUT)
            .await
            .context("running vagrant destroy")?;
        anyhow::ensure!(
            output.status.success(),
            "vagrant destroy exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(())
    }

    async fn log_tail(&self) -> Option<String> {
        let text = tokio::fs::read_to_string(self.dir.join(VAGRANT_LOG))
            .await
            .ok()?;
        Some(tail(&text, LOG_TAIL_LINES))
    }
}
