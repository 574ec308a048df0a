//! Certificate store layout and rotation verification.
//!
//! After `rke2 certificate rotate`, the previous certificates are moved to a
//! `tls-<unix-timestamp>` sibling of the live `tls/` directory. Files that the
//! rotation deliberately leaves untouched (CA material and service account
//! keys) must come out of `diff -s` as identical between the two.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Parent of the live `tls/` directory and of every rotated copy.
pub const SERVER_DATA_DIR: &str = "/var/lib/rancher/rke2/server";

/// Files a rotation must leave byte-identical.
pub const PRESERVED_FILES: &[&str] = &[
    "client-ca.crt",
    "client-ca.key",
    "client-ca.nochain.crt",
    "peer-ca.crt",
    "peer-ca.key",
    "request-header-ca.crt",
    "request-header-ca.key",
    "server-ca.crt",
    "server-ca.key",
    "server-ca.nochain.crt",
    "service.current.key",
    "service.key",
];

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static ROTATED_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tls-[0-9]+").expect("valid regex"));

/// Command listing the server data directory newest first.
#[must_use]
pub fn list_rotated_dirs_command() -> String {
    format!("sudo ls -lt {SERVER_DATA_DIR}/ | grep tls")
}

/// First `tls-<digits>` name in a newest-first `ls -lt` listing.
#[must_use]
pub fn newest_rotated_dir(listing: &str) -> Option<&str> {
    ROTATED_DIR.find(listing).map(|m| m.as_str())
}

/// Command printing the basename of every file identical between the live
/// `tls/` directory and `rotated`, one per line.
#[must_use]
pub fn identical_files_command(rotated: &str) -> String {
    format!(
        "sudo diff -sr {SERVER_DATA_DIR}/tls/ {SERVER_DATA_DIR}/{rotated}/ \
         | grep -i identical | cut -f4 -d ' ' | xargs basename -a"
    )
}

/// Outcome of comparing an observed listing against [`PRESERVED_FILES`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateDiff {
    /// Expected but not reported identical.
    pub missing: Vec<String>,
    /// Reported identical but not expected.
    pub unexpected: Vec<String>,
    /// Names the listing repeated.
    pub duplicates: Vec<String>,
}

impl CertificateDiff {
    /// The observed set equals the expected set.
    ///
    /// Duplicates alone do not make a mismatch.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Compare newline-separated file names against `expected` as sets.
///
/// Blank lines are dropped; repeated names are recorded in
/// [`CertificateDiff::duplicates`] but compared once.
#[must_use]
pub fn compare_file_sets(listing: &str, expected: &[&str]) -> CertificateDiff {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for name in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !seen.insert(name) {
            duplicates.insert(name.to_string());
        }
    }
    let expected: BTreeSet<&str> = expected.iter().copied().collect();

    CertificateDiff {
        missing: expected.difference(&seen).map(|s| (*s).to_string()).collect(),
        unexpected: seen.difference(&expected).map(|s| (*s).to_string()).collect(),
        duplicates: duplicates.into_iter().collect(),
    }
}
