//! Runs the scenario catalogue top to bottom and decides teardown.
//!
//! A failed scenario does not stop the run. Scenarios whose declared
//! dependency did not pass are skipped, and a provisioning failure skips
//! everything after it.
//!
//! Imports only from `crate::domain`, `crate::application::ports` and sibling
//! application modules.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use crate::application::ports::{
    ClusterProvisioner, KubeconfigStore, ProgressReporter, RemoteExecutor,
};
use crate::application::services::scenarios::{self, ScenarioEnv};
use crate::application::services::{cluster, diagnostics};
use crate::domain::{
    ClusterHandle, HarnessConfig, Outcome, ProvisioningError, RunReport, Scenario,
    ScenarioResult, Teardown,
};

/// Everything the run needs to reach the outside world.
pub struct Collaborators<'a, E, P, S, R> {
    pub exec: &'a E,
    pub provisioner: &'a P,
    pub store: &'a S,
    pub reporter: &'a R,
}

/// State threaded through the run: the cluster under test and the results
/// so far.
#[derive(Debug, Default)]
pub struct RunContext {
    pub cluster: Option<ClusterHandle>,
    pub report: RunReport,
    /// Set once provisioning has failed; nothing further runs.
    aborted: bool,
}

/// Final report plus what happened to the cluster.
#[derive(Debug, Serialize)]
pub struct SuiteSummary {
    #[serde(flatten)]
    pub report: RunReport,
    pub teardown: Teardown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
    /// Kubeconfig left behind for a preserved cluster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
}

impl SuiteSummary {
    /// Every scenario passed and teardown (if any) succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.report.failed() && self.teardown_error.is_none()
    }
}

/// Run every scenario in order, then tear down per the run outcome.
pub async fn run_suite<E, P, S, R>(
    c: &Collaborators<'_, E, P, S, R>,
    config: &HarnessConfig,
) -> SuiteSummary
where
    E: RemoteExecutor,
    P: ClusterProvisioner,
    S: KubeconfigStore,
    R: ProgressReporter,
{
    let mut ctx = RunContext::default();
    for scenario in Scenario::ALL {
        run_one(c, config, &mut ctx, scenario).await;
    }
    finish(c, config, ctx).await
}

async fn run_one<E, P, S, R>(
    c: &Collaborators<'_, E, P, S, R>,
    config: &HarnessConfig,
    ctx: &mut RunContext,
    scenario: Scenario,
) where
    E: RemoteExecutor,
    P: ClusterProvisioner,
    S: KubeconfigStore,
    R: ProgressReporter,
{
    let started = Instant::now();
    let mut diagnostics = Vec::new();

    let outcome = if let Some(reason) = skip_reason(ctx, scenario) {
        Outcome::Skipped(reason)
    } else {
        c.reporter.step(scenario.title());
        tracing::info!(scenario = ?scenario, "scenario started");
        match execute(c, config, ctx, scenario).await {
            Ok(()) => Outcome::Passed,
            Err(err) => {
                diagnostics = collect_diagnostics(c, ctx, &err).await;
                Outcome::Failed(format!("{err:#}"))
            }
        }
    };

    match &outcome {
        Outcome::Passed => c.reporter.success(scenario.title()),
        Outcome::Failed(reason) => c.reporter.warn(&format!("{scenario}: {reason}")),
        Outcome::Skipped(reason) => c.reporter.warn(&format!("{scenario} skipped: {reason}")),
    }
    tracing::info!(scenario = ?scenario, outcome = ?outcome, "scenario finished");

    ctx.report.record(ScenarioResult {
        scenario,
        outcome,
        diagnostics,
        duration: started.elapsed(),
    });
}

fn skip_reason(ctx: &RunContext, scenario: Scenario) -> Option<String> {
    if ctx.aborted {
        return Some("provisioning failed".to_string());
    }
    if let Some(dep) = ctx.report.unmet_dependency(scenario) {
        return Some(format!("requires \"{dep}\" to pass"));
    }
    if scenario != Scenario::CreateCluster && ctx.cluster.is_none() {
        return Some("no cluster".to_string());
    }
    None
}

async fn execute<E, P, S, R>(
    c: &Collaborators<'_, E, P, S, R>,
    config: &HarnessConfig,
    ctx: &mut RunContext,
    scenario: Scenario,
) -> Result<()>
where
    E: RemoteExecutor,
    P: ClusterProvisioner,
    S: KubeconfigStore,
    R: ProgressReporter,
{
    if scenario == Scenario::CreateCluster {
        return match cluster::create(c.provisioner, c.exec, c.store, c.reporter, config).await {
            Ok(handle) => {
                ctx.cluster = Some(handle);
                Ok(())
            }
            Err(err) => {
                ctx.aborted = true;
                Err(err)
            }
        };
    }
    let Some(handle) = ctx.cluster.as_mut() else {
        anyhow::bail!("no cluster");
    };
    let env = ScenarioEnv::new(c.exec, c.reporter, &config.budgets);
    scenarios::run(scenario, &env, handle).await
}

async fn collect_diagnostics<E, P, S, R>(
    c: &Collaborators<'_, E, P, S, R>,
    ctx: &RunContext,
    err: &anyhow::Error,
) -> Vec<String>
where
    E: RemoteExecutor,
{
    if let Some(ProvisioningError { log: Some(log), .. }) = err.downcast_ref::<ProvisioningError>() {
        return vec![format!("provisioning log:\n{log}")];
    }
    match ctx.cluster.as_ref().map(ClusterHandle::kubeconfig) {
        Some(Ok(kubeconfig)) => diagnostics::capture(c.exec, kubeconfig).await,
        _ => Vec::new(),
    }
}

async fn finish<E, P, S, R>(
    c: &Collaborators<'_, E, P, S, R>,
    config: &HarnessConfig,
    mut ctx: RunContext,
) -> SuiteSummary
where
    P: ClusterProvisioner,
    S: KubeconfigStore,
    R: ProgressReporter,
{
    let teardown = ctx.report.teardown(config.ci);
    let mut teardown_error = None;
    let mut kubeconfig = None;

    match teardown {
        Teardown::Preserve => {
            kubeconfig = ctx
                .cluster
                .as_ref()
                .and_then(|h| h.kubeconfig().ok())
                .map(|p| p.display().to_string());
            c.reporter
                .warn("FAILED! Cluster left running for inspection");
        }
        Teardown::Destroy => {
            c.reporter.step("destroying cluster");
            let result = match ctx.cluster.as_mut() {
                Some(handle) => cluster::destroy(c.provisioner, c.store, handle).await,
                None => c.provisioner.destroy().await,
            };
            match result {
                Ok(()) => c.reporter.success("cluster destroyed"),
                Err(err) => {
                    tracing::error!(error = %format!("{err:#}"), "teardown failed");
                    c.reporter.warn(&format!("teardown failed: {err:#}"));
                    teardown_error = Some(format!("{err:#}"));
                }
            }
        }
    }

    SuiteSummary {
        report: ctx.report,
        teardown,
        teardown_error,
        kubeconfig,
    }
}
