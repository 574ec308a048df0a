//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Parse errors ──────────────────────────────────────────────────────────────

/// A row of `get nodes` / `get pods` output that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason} in {row:?}")]
pub struct ParseError {
    /// 1-based line number within the command output.
    pub line: usize,
    /// The offending row, verbatim.
    pub row: String,
    /// What was wrong with it.
    pub reason: ParseErrorKind,
}

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected at least {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("unrecognized node status {0:?}")]
    NodeStatus(String),

    #[error("unrecognized pod status {0:?}")]
    PodStatus(String),

    #[error("malformed ready ratio {0:?}")]
    ReadyRatio(String),

    #[error("unterminated restart annotation")]
    RestartAnnotation,
}

// ── Transport errors ──────────────────────────────────────────────────────────

/// A single remote or local command invocation failed.
///
/// Always carries the exact command string so the failing probe can be
/// attributed by whoever reports the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("command failed on {}: `{command}` (exit {}){}", host_label(.host.as_deref()), exit_label(.code.as_ref()), output_suffix(.output))]
    NonZeroExit {
        command: String,
        host: Option<String>,
        code: Option<i32>,
        output: String,
    },

    #[error("could not run `{command}` on {}: {reason}", host_label(.host.as_deref()))]
    Spawn {
        command: String,
        host: Option<String>,
        reason: String,
    },
}

impl TransportError {
    /// The command string that failed.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::NonZeroExit { command, .. } | Self::Spawn { command, .. } => command,
        }
    }
}

fn host_label(host: Option<&str>) -> &str {
    host.unwrap_or("local")
}

fn exit_label(code: Option<&i32>) -> String {
    code.map_or_else(|| "signal".to_string(), ToString::to_string)
}

fn output_suffix(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

// ── Fan-out errors ────────────────────────────────────────────────────────────

/// One host's share of a failed fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    pub host: String,
    pub error: String,
}

/// A fan-out in which at least one host failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed on {failed} of {total} hosts: {}", describe(.failures))]
pub struct FanOutError {
    pub operation: String,
    pub failed: usize,
    pub total: usize,
    pub failures: Vec<HostFailure>,
}

impl FanOutError {
    /// Names of the hosts that failed, in fan-out order.
    #[must_use]
    pub fn failed_hosts(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.host.as_str()).collect()
    }
}

fn describe(failures: &[HostFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.host, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Cluster errors ────────────────────────────────────────────────────────────

/// Errors related to the cluster handle and its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("cannot {operation} while the cluster is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("no kubeconfig has been generated for this cluster yet")]
    MissingKubeconfig,

    #[error("cluster has no server hosts")]
    NoServers,

    #[error("host {0} is not a member of this cluster")]
    UnknownHost(String),
}

/// Fatal failure of the provisioning collaborator. Aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provisioning failed: {reason}")]
pub struct ProvisioningError {
    pub reason: String,
    /// Tail of the collaborator's log, when one was available.
    pub log: Option<String>,
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to harness configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("server_count must be at least 1")]
    NoServers,

    #[error("node OS must not be empty")]
    EmptyNodeOs,

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("budget {name}: interval must be non-zero and no longer than the timeout")]
    InvalidBudget { name: &'static str },
}
