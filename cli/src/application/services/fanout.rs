//! Issue one logical operation across many hosts at once.
//!
//! Results are collected positionally, one slot per host, so a failure can
//! always be traced to the host that produced it.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::future::Future;

use anyhow::Result;
use futures_util::future::join_all;

use crate::application::ports::RemoteExecutor;
use crate::domain::{FanOutError, Host, HostFailure};

/// Per-host results of a fan-out, in the order the hosts were given.
#[derive(Debug)]
pub struct FanOutReport<T> {
    operation: String,
    results: Vec<(Host, Result<T>)>,
}

impl<T> FanOutReport<T> {
    /// Hosts whose operation succeeded.
    #[must_use]
    pub fn succeeded(&self) -> Vec<Host> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(h, _)| h.clone())
            .collect()
    }

    /// Collapse into per-host values, or a [`FanOutError`] naming every host
    /// that failed.
    ///
    /// # Errors
    ///
    /// Returns [`FanOutError`] if any host failed.
    pub fn into_result(self) -> Result<Vec<(Host, T)>> {
        let total = self.results.len();
        let mut values = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (host, result) in self.results {
            match result {
                Ok(value) => values.push((host, value)),
                Err(err) => failures.push(HostFailure {
                    host: host.name().to_string(),
                    error: format!("{err:#}"),
                }),
            }
        }
        if failures.is_empty() {
            return Ok(values);
        }
        Err(FanOutError {
            operation: self.operation,
            failed: failures.len(),
            total,
            failures,
        }
        .into())
    }
}

/// Run `op` against every host concurrently and wait for all of them.
///
/// Every host runs to completion even when others fail.
pub async fn fan_out<'h, T, F, Fut>(operation: &str, hosts: &'h [Host], op: F) -> FanOutReport<T>
where
    F: Fn(&'h Host) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcomes = join_all(hosts.iter().map(&op)).await;
    let results: Vec<(Host, Result<T>)> = hosts.iter().cloned().zip(outcomes).collect();
    for (host, result) in &results {
        if let Err(err) = result {
            tracing::warn!(%host, operation, error = %format!("{err:#}"), "host failed");
        }
    }
    FanOutReport {
        operation: operation.to_string(),
        results,
    }
}

/// Run the same literal command on every host.
pub async fn run_on_each(
    exec: &impl RemoteExecutor,
    hosts: &[Host],
    command: &str,
) -> FanOutReport<String> {
    fan_out(command, hosts, |host| exec.run_on_host(host, command)).await
}
