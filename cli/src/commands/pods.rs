//! Pods command: one-shot parse of `get pods` across all namespaces.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::state;
use crate::commands::SnapshotArgs;
use crate::output::json;

/// Entry point for `clustervet pods`.
///
/// # Errors
///
/// Returns an error if the pod list cannot be fetched or parsed.
pub async fn run(
    app: &AppContext,
    args: &SnapshotArgs,
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let pods = state::parse_pods(exec, reporter, &args.kubeconfig, false).await?;
    if app.is_json() {
        println!("{}", json::render(&pods)?);
    } else {
        app.human().render_pods(&pods);
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
