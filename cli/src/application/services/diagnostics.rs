//! Best-effort state capture attached to failed scenarios.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use crate::application::ports::RemoteExecutor;

/// Snapshot nodes and pods for a failure report.
///
/// Never fails: a command that cannot run contributes its error text instead.
pub async fn capture(exec: &impl RemoteExecutor, kubeconfig: &Path) -> Vec<String> {
    let kc = kubeconfig.display();
    let commands = [
        format!("kubectl get nodes -o wide --kubeconfig={kc}"),
        format!("kubectl get pods -A -o wide --kubeconfig={kc}"),
    ];
    let mut captured = Vec::with_capacity(commands.len());
    for command in &commands {
        let body = match exec.run_local(command).await {
            Ok(output) => output.trim_end().to_string(),
            Err(err) => format!("(capture failed: {err:#})"),
        };
        captured.push(format!("$ {command}\n{body}"));
    }
    captured
}
