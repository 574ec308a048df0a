//! Run command: provision a cluster, walk the scenario catalogue, tear down.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use clap::builder::FalseyValueParser;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::sequencer::{self, Collaborators};
use crate::domain::{HarnessConfig, PathsConfig, validate_config};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::infra::executor::VagrantExecutor;
use crate::infra::kubeconfig::FsKubeconfigStore;
use crate::infra::provisioner::VagrantProvisioner;
use crate::output::{TerminalReporter, json};

/// Arguments for the run command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Vagrant box for every node (e.g. bento/ubuntu-24.04)
    #[arg(long, env = "E2E_NODE_OS")]
    pub node_os: Option<String>,

    /// Number of server nodes
    #[arg(long)]
    pub server_count: Option<usize>,

    /// Number of agent nodes
    #[arg(long)]
    pub agent_count: Option<usize>,

    /// CNI plugin (canal, cilium, calico)
    #[arg(long, env = "E2E_CNI")]
    pub cni: Option<String>,

    /// Release to install, e.g. v1.31.1+rke2r1
    #[arg(long, env = "E2E_RELEASE_VERSION")]
    pub release_version: Option<String>,

    /// Always destroy the cluster, even when a scenario failed
    #[arg(long, env = "CI", value_parser = FalseyValueParser::new())]
    pub ci: bool,

    /// Directory holding the Vagrantfile
    #[arg(long)]
    pub vagrant_dir: Option<PathBuf>,

    /// Directory holding the workload manifests
    #[arg(long)]
    pub workload_dir: Option<PathBuf>,

    /// Directory the kubeconfig is written to
    #[arg(long)]
    pub kubeconfig_dir: Option<PathBuf>,
}

/// Flags win over the config file; unset flags leave file values alone.
pub fn apply_overrides(config: &mut HarnessConfig, args: &RunArgs) {
    let cluster = &mut config.cluster;
    if let Some(os) = &args.node_os {
        cluster.node_os.clone_from(os);
    }
    if let Some(n) = args.server_count {
        cluster.server_count = n;
    }
    if let Some(n) = args.agent_count {
        cluster.agent_count = n;
    }
    if args.cni.is_some() {
        cluster.cni.clone_from(&args.cni);
    }
    if args.release_version.is_some() {
        cluster.release_version.clone_from(&args.release_version);
    }
    config.ci |= args.ci;

    let paths = &mut config.paths;
    if let Some(dir) = &args.vagrant_dir {
        paths.vagrant_dir.clone_from(dir);
    }
    if let Some(dir) = &args.workload_dir {
        paths.workload_dir.clone_from(dir);
    }
    if let Some(dir) = &args.kubeconfig_dir {
        paths.kubeconfig_dir.clone_from(dir);
    }
}

/// Pin every configured directory to the invoking working directory.
///
/// Local commands run inside `vagrant_dir`, so a relative kubeconfig or
/// manifest path would otherwise resolve against the wrong directory.
///
/// # Errors
///
/// Returns an error if the working directory cannot be determined.
pub fn resolve_paths(paths: &mut PathsConfig) -> Result<()> {
    for dir in [
        &mut paths.vagrant_dir,
        &mut paths.workload_dir,
        &mut paths.kubeconfig_dir,
    ] {
        *dir = std::path::absolute(&*dir)
            .with_context(|| format!("cannot resolve {}", dir.display()))?;
    }
    Ok(())
}

/// Entry point for `clustervet run`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or is invalid, or
/// when the run did not succeed (any scenario failed, or teardown failed).
pub async fn run(app: &AppContext, args: &RunArgs, store: &impl ConfigStore) -> Result<()> {
    let mut config = store.load()?;
    apply_overrides(&mut config, args);
    validate_config(&config)?;
    resolve_paths(&mut config.paths)?;

    let cluster = &config.cluster;
    app.output.header(&format!(
        "Validating {} server(s) and {} agent(s) on {}",
        cluster.server_count, cluster.agent_count, cluster.node_os
    ));
    tracing::info!(
        servers = cluster.server_count,
        agents = cluster.agent_count,
        node_os = %cluster.node_os,
        ci = config.ci,
        "starting validation run"
    );

    let vagrant_dir = &config.paths.vagrant_dir;
    let exec = VagrantExecutor::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT).in_dir(vagrant_dir));
    let provisioner = VagrantProvisioner::new(
        TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT).in_dir(vagrant_dir),
        vagrant_dir,
    );
    let kubeconfigs = FsKubeconfigStore::new(&config.paths.kubeconfig_dir);
    let reporter = TerminalReporter::new(&app.output);

    let collaborators = Collaborators {
        exec: &exec,
        provisioner: &provisioner,
        store: &kubeconfigs,
        reporter: &reporter,
    };
    let summary = sequencer::run_suite(&collaborators, &config).await;

    if app.is_json() {
        println!("{}", json::render(&summary)?);
    } else {
        app.human().render_summary(&summary);
    }

    if summary.succeeded() {
        return Ok(());
    }
    let (_, failed, _) = summary.report.counts();
    match &summary.teardown_error {
        Some(err) => anyhow::bail!("teardown failed: {err}"),
        None => anyhow::bail!("{failed} scenario(s) failed"),
    }
}
