//! Pod records parsed from `get pods -A --no-headers -o wide` output.
//!
//! Pure functions only: no I/O, no async.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::domain::error::{ParseError, ParseErrorKind};
use crate::domain::node::optional_column;

/// NAMESPACE NAME READY STATUS RESTARTS AGE IP NODE.
const POD_MIN_COLUMNS: usize = 8;

/// Pods created by the helm controller run to completion instead of staying up.
pub const HELM_INSTALL_MARKER: &str = "helm-install";

/// Value of the `STATUS` column.
///
/// `kubectl` reports either the pod phase or the reason of the container
/// holding it back; both land here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PodStatus {
    Running,
    Completed,
    Pending,
    Succeeded,
    Failed,
    Unknown,
    ContainerCreating,
    PodInitializing,
    /// `Init:1/2`, `Init:CrashLoopBackOff`, ...
    Init(String),
    CrashLoopBackOff,
    Error,
    Terminating,
    ImagePullBackOff,
    ErrImagePull,
    CreateContainerConfigError,
    CreateContainerError,
    RunContainerError,
    StartError,
    ContainerStatusUnknown,
    Evicted,
    OOMKilled,
    NodeAffinity,
    NodeLost,
    UnexpectedAdmissionError,
    SchedulingGated,
    /// Container exited with this code and no reason was recorded.
    ExitCode(i32),
    /// Container was killed by this signal and no reason was recorded.
    Signal(i32),
}

impl PodStatus {
    const SIMPLE: &'static [(&'static str, PodStatus)] = &[
        ("Running", Self::Running),
        ("Completed", Self::Completed),
        ("Pending", Self::Pending),
        ("Succeeded", Self::Succeeded),
        ("Failed", Self::Failed),
        ("Unknown", Self::Unknown),
        ("ContainerCreating", Self::ContainerCreating),
        ("PodInitializing", Self::PodInitializing),
        ("CrashLoopBackOff", Self::CrashLoopBackOff),
        ("Error", Self::Error),
        ("Terminating", Self::Terminating),
        ("ImagePullBackOff", Self::ImagePullBackOff),
        ("ErrImagePull", Self::ErrImagePull),
        ("CreateContainerConfigError", Self::CreateContainerConfigError),
        ("CreateContainerError", Self::CreateContainerError),
        ("RunContainerError", Self::RunContainerError),
        ("StartError", Self::StartError),
        ("ContainerStatusUnknown", Self::ContainerStatusUnknown),
        ("Evicted", Self::Evicted),
        ("OOMKilled", Self::OOMKilled),
        ("NodeAffinity", Self::NodeAffinity),
        ("NodeLost", Self::NodeLost),
        ("UnexpectedAdmissionError", Self::UnexpectedAdmissionError),
        ("SchedulingGated", Self::SchedulingGated),
    ];
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(detail) => return write!(f, "Init:{detail}"),
            Self::ExitCode(code) => return write!(f, "ExitCode:{code}"),
            Self::Signal(signal) => return write!(f, "Signal:{signal}"),
            _ => {}
        }
        let token = Self::SIMPLE
            .iter()
            .find(|(_, status)| status == self)
            .map_or("Unknown", |(token, _)| token);
        f.write_str(token)
    }
}

impl FromStr for PodStatus {
    type Err = ParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(detail) = s.strip_prefix("Init:")
            && !detail.is_empty()
        {
            return Ok(Self::Init(detail.to_string()));
        }
        let numbered = |prefix: &str| {
            s.strip_prefix(prefix)
                .map(|n| n.parse::<i32>().map_err(|_| ParseErrorKind::PodStatus(s.to_string())))
        };
        if let Some(code) = numbered("ExitCode:") {
            return code.map(Self::ExitCode);
        }
        if let Some(signal) = numbered("Signal:") {
            return signal.map(Self::Signal);
        }
        Self::SIMPLE
            .iter()
            .find(|(token, _)| *token == s)
            .map(|(_, status)| status.clone())
            .ok_or_else(|| ParseErrorKind::PodStatus(s.to_string()))
    }
}

impl Serialize for PodStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The `READY` column: containers ready over containers declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadyRatio {
    pub ready: u32,
    pub total: u32,
}

impl ReadyRatio {
    /// All declared containers are ready.
    #[must_use]
    pub fn is_full(self) -> bool {
        self.total > 0 && self.ready == self.total
    }
}

impl fmt::Display for ReadyRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ready, self.total)
    }
}

impl FromStr for ReadyRatio {
    type Err = ParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseErrorKind::ReadyRatio(s.to_string());
        let (ready, total) = s.split_once('/').ok_or_else(bad)?;
        Ok(Self {
            ready: ready.parse().map_err(|_| bad())?,
            total: total.parse().map_err(|_| bad())?,
        })
    }
}

impl Serialize for ReadyRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One pod as observed in a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    pub ready: ReadyRatio,
    pub status: PodStatus,
    /// Restart count, including any `(5m ago)` annotation.
    pub restarts: String,
    pub ip: Option<String>,
    pub node: Option<String>,
}

impl Pod {
    /// Assert the pod has settled: helm install jobs `Completed`, everything
    /// else `Running`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the pod, its status and the expected status.
    pub fn ensure_settled(&self) -> Result<(), String> {
        let expected = if self.name.contains(HELM_INSTALL_MARKER) {
            PodStatus::Completed
        } else {
            PodStatus::Running
        };
        if self.status == expected {
            Ok(())
        } else {
            Err(format!(
                "pod {}/{} is {}, expected {expected}",
                self.namespace, self.name, self.status
            ))
        }
    }

    /// Running with every container ready.
    #[must_use]
    pub fn is_running_and_ready(&self) -> bool {
        self.status == PodStatus::Running && self.ready.is_full()
    }
}

/// Number of pods whose name contains `needle`.
#[must_use]
pub fn count_named(pods: &[Pod], needle: &str) -> usize {
    pods.iter().filter(|p| p.name.contains(needle)).count()
}

/// Parse the full output of `get pods -A --no-headers -o wide`.
///
/// # Errors
///
/// Returns a [`ParseError`] for the first malformed row.
pub fn parse_pod_table(output: &str) -> Result<Vec<Pod>, ParseError> {
    output
        .lines()
        .enumerate()
        .filter(|(_, row)| !row.trim().is_empty())
        .map(|(idx, row)| {
            parse_pod_row(row).map_err(|reason| ParseError {
                line: idx + 1,
                row: row.to_string(),
                reason,
            })
        })
        .collect()
}

fn parse_pod_row(row: &str) -> Result<Pod, ParseErrorKind> {
    let fields = join_restart_annotation(row.split_whitespace().collect())?;
    if fields.len() < POD_MIN_COLUMNS {
        return Err(ParseErrorKind::ColumnCount {
            expected: POD_MIN_COLUMNS,
            found: fields.len(),
        });
    }
    Ok(Pod {
        namespace: fields[0].clone(),
        name: fields[1].clone(),
        ready: fields[2].parse()?,
        status: fields[3].parse()?,
        restarts: fields[4].clone(),
        ip: optional_column(&fields[6]),
        node: optional_column(&fields[7]),
    })
}

/// Fold `2 (5m ago)` in the RESTARTS column back into a single field.
fn join_restart_annotation(fields: Vec<&str>) -> Result<Vec<String>, ParseErrorKind> {
    let mut out: Vec<String> = Vec::with_capacity(fields.len());
    let mut iter = fields.into_iter().enumerate();
    while let Some((idx, field)) = iter.next() {
        if idx == 5 && field.starts_with('(') {
            let mut annotation = field.to_string();
            while !annotation.ends_with(')') {
                let (_, next) = iter.next().ok_or(ParseErrorKind::RestartAnnotation)?;
                annotation.push(' ');
                annotation.push_str(next);
            }
            if let Some(restarts) = out.last_mut() {
                restarts.push(' ');
                restarts.push_str(&annotation);
            }
            continue;
        }
        out.push(field.to_string());
    }
    Ok(out)
}
