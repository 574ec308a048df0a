//! Vagrant-backed implementation of the `RemoteExecutor` port.
//!
//! Local commands go through `bash -c` so pipes and redirections in probe
//! strings work; host commands go through `vagrant ssh <host> -c`.

use std::process::Output;

use anyhow::Result;

use crate::application::ports::{CommandRunner, RemoteExecutor};
use crate::domain::{Host, TransportError};

pub struct VagrantExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> VagrantExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn invoke(
        &self,
        program: &str,
        args: &[&str],
        command: &str,
        host: Option<&Host>,
    ) -> Result<String> {
        let output = self
            .runner
            .run(program, args)
            .await
            .map_err(|err| TransportError::Spawn {
                command: command.to_string(),
                host: host.map(|h| h.name().to_string()),
                reason: format!("{err:#}"),
            })?;
        into_text(output, command, host)
    }
}

/// Combined stdout and stderr, or a transport error on nonzero exit.
fn into_text(output: Output, command: &str, host: Option<&Host>) -> Result<String> {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    if output.status.success() {
        return Ok(text);
    }
    Err(TransportError::NonZeroExit {
        command: command.to_string(),
        host: host.map(|h| h.name().to_string()),
        code: output.status.code(),
        output: text,
    }
    .into())
}

impl<R: CommandRunner> RemoteExecutor for VagrantExecutor<R> {
    async fn run_local(&self, command: &str) -> Result<String> {
        tracing::debug!(command, "local");
        self.invoke("bash", &["-c", command], command, None).await
    }

    async fn run_on_host(&self, host: &Host, command: &str) -> Result<String> {
        tracing::debug!(%host, command, "remote");
        self.invoke("vagrant", &["ssh", host.name(), "-c", command], command, Some(host))
            .await
    }
}
