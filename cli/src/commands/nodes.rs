//! Nodes command: one-shot parse of `get nodes` for a kubeconfig.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::state;
use crate::commands::SnapshotArgs;
use crate::output::json;

/// Entry point for `clustervet nodes`.
///
/// # Errors
///
/// Returns an error if the node list cannot be fetched or parsed.
pub async fn run(
    app: &AppContext,
    args: &SnapshotArgs,
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let nodes = state::parse_nodes(exec, reporter, &args.kubeconfig, false).await?;
    if app.is_json() {
        println!("{}", json::render(&nodes)?);
    } else {
        app.human().render_nodes(&nodes);
    }
    Ok(())
}

/// Same as [`run`] with the production executor.
///
/// # Errors
///
/// See [`run`].
pub async fn run_local(app: &AppContext, args: &SnapshotArgs) -> Result<()> {
    let reporter = crate::output::TerminalReporter::new(&app.output);
    run(app, args, &super::local_executor(), &reporter).await
}
