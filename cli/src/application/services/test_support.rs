//! Shared test doubles for service tests.
//!
//! `ScriptedExecutor` answers commands by substring match and records every
//! call in order; `RecordingReporter` keeps whatever the services emit.
//! `exit_status` and friends build process outputs for runner stubs.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;

use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::domain::{Host, TransportError};

/// Build an `ExitStatus` from a logical exit code.
#[cfg(unix)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    std::process::ExitStatus::from_raw(code as u32)
}

pub fn ok_output(stdout: &[u8]) -> std::process::Output {
    std::process::Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn fail_output() -> std::process::Output {
    std::process::Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: b"boom\n".to_vec(),
    }
}

/// One command the executor was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// `None` for local commands.
    pub host: Option<String>,
    pub command: String,
}

type Reply = Result<String, String>;

struct Rule {
    host: Option<String>,
    needle: String,
    /// Popped one per call; the last reply repeats forever.
    replies: Mutex<VecDeque<Reply>>,
}

/// Executor answering from a script. Unscripted commands succeed with empty
/// output.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<Rule>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, host: Option<&str>, needle: &str, replies: Vec<Reply>) -> Self {
        self.rules.push(Rule {
            host: host.map(ToString::to_string),
            needle: needle.to_string(),
            replies: Mutex::new(replies.into()),
        });
        self
    }

    /// Local commands containing `needle` print `output`.
    pub fn local(self, needle: &str, output: &str) -> Self {
        self.rule(None, needle, vec![Ok(output.to_string())])
    }

    /// Local commands containing `needle` print each of `outputs` in turn.
    pub fn local_seq(self, needle: &str, outputs: &[&str]) -> Self {
        let replies = outputs.iter().map(|o| Ok((*o).to_string())).collect();
        self.rule(None, needle, replies)
    }

    /// Local commands containing `needle` exit nonzero.
    pub fn local_fails(self, needle: &str) -> Self {
        self.rule(None, needle, vec![Err("exit 1".to_string())])
    }

    /// Commands on `host` containing `needle` print `output`.
    pub fn on_host(self, host: &str, needle: &str, output: &str) -> Self {
        self.rule(Some(host), needle, vec![Ok(output.to_string())])
    }

    /// Commands on `host` containing `needle` exit nonzero.
    pub fn fail_on(self, host: &str, needle: &str) -> Self {
        self.rule(Some(host), needle, vec![Err("exit 1".to_string())])
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands sent to `host`, in order.
    pub fn commands_on(&self, host: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.host.as_deref() == Some(host))
            .map(|c| c.command)
            .collect()
    }

    fn answer(&self, host: Option<&str>, command: &str) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            host: host.map(ToString::to_string),
            command: command.to_string(),
        });
        let rule = self
            .rules
            .iter()
            .find(|r| r.host.as_deref() == host && command.contains(&r.needle));
        let Some(rule) = rule else {
            return Ok(String::new());
        };
        let mut replies = rule.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap_or(Ok(String::new()))
        };
        reply.map_err(|output| {
            TransportError::NonZeroExit {
                command: command.to_string(),
                host: host.map(ToString::to_string),
                code: Some(1),
                output,
            }
            .into()
        })
    }
}

impl RemoteExecutor for ScriptedExecutor {
    async fn run_local(&self, command: &str) -> Result<String> {
        self.answer(None, command)
    }

    async fn run_on_host(&self, host: &Host, command: &str) -> Result<String> {
        self.answer(Some(host.name()), command)
    }
}

/// Reporter that keeps every message, prefixed by kind.
#[derive(Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, kind: &str, message: &str) {
        self.lines.lock().unwrap().push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.push("step", message);
    }
    fn success(&self, message: &str) {
        self.push("success", message);
    }
    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
    fn dump(&self, title: &str, body: &str) {
        self.push("dump", &format!("{title}\n{body}"));
    }
}
