//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`: never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;

use crate::domain::{ClusterConfig, HarnessConfig, Host};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── Remote Execution Port ─────────────────────────────────────────────────────

/// Single-shot command execution, locally or on one cluster member.
///
/// No retries at this layer. On a nonzero exit implementations return a
/// [`crate::domain::TransportError`] carrying the exact command string.
#[allow(async_fn_in_trait)]
pub trait RemoteExecutor {
    /// Run `command` from the harness's own vantage point and return the
    /// combined stdout and stderr.
    async fn run_local(&self, command: &str) -> Result<String>;
    /// Run `command` on `host` and return the combined stdout and stderr.
    async fn run_on_host(&self, host: &Host, command: &str) -> Result<String>;
}

// ── Provisioning Port ─────────────────────────────────────────────────────────

/// VM lifecycle for the whole cluster. Opaque; failures are fatal to a run.
#[allow(async_fn_in_trait)]
pub trait ClusterProvisioner {
    /// Create and provision every host in `hosts`.
    async fn provision(&self, spec: &ClusterConfig, hosts: &[Host]) -> Result<()>;
    /// Tear down every provisioned host.
    async fn destroy(&self) -> Result<()>;
    /// Tail of the provisioner's own log, for diagnostics.
    async fn log_tail(&self) -> Option<String>;
}

// ── Kubeconfig Store Port ─────────────────────────────────────────────────────

/// Where generated kubeconfig files live on the local machine.
pub trait KubeconfigStore {
    /// Persist `contents` as the kubeconfig for `server` and return its path.
    fn write(&self, server: &Host, contents: &str) -> Result<PathBuf>;
    /// Remove a kubeconfig previously returned by `write`.
    fn remove(&self, path: &Path) -> Result<()>;
}

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Abstracts where the harness configuration file lives.
pub trait ConfigStore {
    /// Load the configuration, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<HarnessConfig>;
    /// Path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait: no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit a raw diagnostic block (command output, parsed tables).
    fn dump(&self, title: &str, body: &str);
}
