//! Command implementations

pub mod nodes;
pub mod pods;
pub mod run;
pub mod version;

use std::path::PathBuf;

use clap::Args;

use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::infra::executor::VagrantExecutor;

/// Arguments shared by the one-shot snapshot commands.
#[derive(Args)]
pub struct SnapshotArgs {
    /// Kubeconfig of the cluster to inspect
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: PathBuf,
}

/// Executor for commands that only ever run locally.
fn local_executor() -> VagrantExecutor<TokioCommandRunner> {
    VagrantExecutor::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT))
}
