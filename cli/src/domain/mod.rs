//! Domain layer: pure types, table parsers and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod certs;
pub mod cluster;
pub mod config;
pub mod error;
pub mod node;
pub mod pod;
pub mod scenario;
pub mod workload;

pub use cluster::{ClusterHandle, ClusterState, Host, HostRole, ServiceState};
pub use config::{Budgets, ClusterConfig, HarnessConfig, PathsConfig, PollBudget, validate_config};
pub use error::{
    ClusterError, ConfigError, FanOutError, HostFailure, ParseError, ParseErrorKind,
    ProvisioningError, TransportError,
};
pub use node::{Node, NodeStatus, parse_node_table};
pub use pod::{Pod, PodStatus, ReadyRatio, count_named, parse_pod_table};
pub use scenario::{Outcome, RunReport, Scenario, ScenarioResult, Teardown};
pub use workload::Workload;
