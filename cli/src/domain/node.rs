//! Node records parsed from `get nodes --no-headers -o wide` output.
//!
//! Pure functions only: no I/O, no async.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::error::{ParseError, ParseErrorKind};

/// Columns before the free-form `OS-IMAGE` column:
/// NAME STATUS ROLES AGE VERSION INTERNAL-IP EXTERNAL-IP.
const NODE_MIN_COLUMNS: usize = 7;

/// Condition reported in the `STATUS` column, without scheduling suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeStatus {
    Ready,
    NotReady,
    Unknown,
}

impl NodeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "NotReady",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = ParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ready" => Ok(Self::Ready),
            "NotReady" => Ok(Self::NotReady),
            "Unknown" => Ok(Self::Unknown),
            other => Err(ParseErrorKind::NodeStatus(other.to_string())),
        }
    }
}

/// One node as observed in a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    pub status: NodeStatus,
    /// `false` when the node is cordoned (`Ready,SchedulingDisabled`).
    pub schedulable: bool,
    /// Empty when the column reads `<none>`.
    pub roles: Vec<String>,
    pub version: String,
    pub internal_ip: Option<String>,
    pub external_ip: Option<String>,
}

impl Node {
    /// Assert the node reports `Ready`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the node and its observed status otherwise.
    pub fn ensure_ready(&self) -> Result<(), String> {
        if self.status == NodeStatus::Ready {
            Ok(())
        } else {
            Err(format!(
                "node {} is {}, expected Ready",
                self.name, self.status
            ))
        }
    }
}

/// Parse the full output of `get nodes --no-headers -o wide`.
///
/// Rows come back in the order the command printed them. Blank lines are
/// skipped; anything else that cannot be interpreted is an error.
///
/// # Errors
///
/// Returns a [`ParseError`] for the first malformed row.
pub fn parse_node_table(output: &str) -> Result<Vec<Node>, ParseError> {
    output
        .lines()
        .enumerate()
        .filter(|(_, row)| !row.trim().is_empty())
        .map(|(idx, row)| {
            parse_node_row(row).map_err(|reason| ParseError {
                line: idx + 1,
                row: row.to_string(),
                reason,
            })
        })
        .collect()
}

fn parse_node_row(row: &str) -> Result<Node, ParseErrorKind> {
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() < NODE_MIN_COLUMNS {
        return Err(ParseErrorKind::ColumnCount {
            expected: NODE_MIN_COLUMNS,
            found: fields.len(),
        });
    }

    let mut conditions = fields[1].split(',');
    let status: NodeStatus = conditions.next().unwrap_or_default().parse()?;
    let mut schedulable = true;
    for extra in conditions {
        match extra {
            "SchedulingDisabled" => schedulable = false,
            other => return Err(ParseErrorKind::NodeStatus(other.to_string())),
        }
    }

    let roles = match fields[2] {
        "<none>" => Vec::new(),
        list => list.split(',').map(str::to_string).collect(),
    };

    Ok(Node {
        name: fields[0].to_string(),
        status,
        schedulable,
        roles,
        version: fields[4].to_string(),
        internal_ip: optional_column(fields[5]),
        external_ip: optional_column(fields[6]),
    })
}

/// `kubectl` prints `<none>` for absent values.
pub(crate) fn optional_column(value: &str) -> Option<String> {
    (value != "<none>").then(|| value.to_string())
}
