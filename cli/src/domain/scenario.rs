//! Scenario catalogue and run-level result accumulation.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Every validation step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    CreateCluster,
    NodeStatus,
    PodStatus,
    ClusterIpService,
    NodePortService,
    LoadBalancerService,
    Ingress,
    DaemonSet,
    DnsAccess,
    LocalPathStorage,
    ClusterRestart,
    StopAndRotateCertificates,
    StartAfterRotation,
    ValidateCertificates,
}

impl Scenario {
    /// The full run, in the order it executes.
    pub const ALL: [Scenario; 14] = [
        Self::CreateCluster,
        Self::NodeStatus,
        Self::PodStatus,
        Self::ClusterIpService,
        Self::NodePortService,
        Self::LoadBalancerService,
        Self::Ingress,
        Self::DaemonSet,
        Self::DnsAccess,
        Self::LocalPathStorage,
        Self::ClusterRestart,
        Self::StopAndRotateCertificates,
        Self::StartAfterRotation,
        Self::ValidateCertificates,
    ];

    /// Human-readable title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::CreateCluster => "Starts up with no issues",
            Self::NodeStatus => "Checks node status",
            Self::PodStatus => "Checks pod status",
            Self::ClusterIpService => "Verifies ClusterIP service",
            Self::NodePortService => "Verifies NodePort service",
            Self::LoadBalancerService => "Verifies LoadBalancer service",
            Self::Ingress => "Verifies ingress",
            Self::DaemonSet => "Verifies daemonset",
            Self::DnsAccess => "Verifies DNS access",
            Self::LocalPathStorage => "Verifies local-path storage",
            Self::ClusterRestart => "Restarts normally",
            Self::StopAndRotateCertificates => "Stops servers and rotates certificates",
            Self::StartAfterRotation => "Starts normally after rotation",
            Self::ValidateCertificates => "Validates certificates",
        }
    }

    /// Scenarios that must have passed for this one to be meaningful.
    ///
    /// Every scenario implicitly needs a cluster handle; that is enforced by
    /// the sequencer, not listed here.
    #[must_use]
    pub fn depends_on(self) -> &'static [Scenario] {
        match self {
            Self::StartAfterRotation => &[Self::StopAndRotateCertificates],
            Self::ValidateCertificates => &[Self::StartAfterRotation],
            _ => &[],
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// How a scenario ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl Outcome {
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One scenario's verdict plus whatever was captured to explain it.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// What happens to the cluster once the run is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Teardown {
    Destroy,
    Preserve,
}

/// Accumulated results of a run.
///
/// `failed` is sticky: once any scenario fails it stays set.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioResult>,
    failed: bool,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            scenarios: Vec::new(),
            failed: false,
        }
    }

    pub fn record(&mut self, result: ScenarioResult) {
        self.failed |= !result.outcome.is_passed();
        self.scenarios.push(result);
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Outcome recorded for `scenario`, if it has run.
    #[must_use]
    pub fn outcome_of(&self, scenario: Scenario) -> Option<&Outcome> {
        self.scenarios
            .iter()
            .find(|r| r.scenario == scenario)
            .map(|r| &r.outcome)
    }

    /// First dependency of `scenario` that did not pass.
    #[must_use]
    pub fn unmet_dependency(&self, scenario: Scenario) -> Option<Scenario> {
        scenario
            .depends_on()
            .iter()
            .copied()
            .find(|dep| !self.outcome_of(*dep).is_some_and(Outcome::is_passed))
    }

    /// Failed runs are kept for inspection unless running in CI.
    #[must_use]
    pub fn teardown(&self, ci: bool) -> Teardown {
        if self.failed && !ci {
            Teardown::Preserve
        } else {
            Teardown::Destroy
        }
    }

    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        self.scenarios
            .iter()
            .fold((0, 0, 0), |(p, f, s), r| match r.outcome {
                Outcome::Passed => (p + 1, f, s),
                Outcome::Failed(_) => (p, f + 1, s),
                Outcome::Skipped(_) => (p, f, s + 1),
            })
    }
}
