//! Structural tests for layer boundary enforcement.
//!
//! These tests scan source files to verify that the domain stays pure and
//! that application services only reach the outside world through ports.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Every line under `src/<layer>` containing one of `forbidden`.
fn violations(layer: &str, forbidden: &[&str]) -> Vec<String> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut found = Vec::new();
    for file in collect_rs_files(&root.join("src").join(layer)) {
        let rel = file.strip_prefix(root).unwrap_or(&file).display().to_string();
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            if let Some(pattern) = forbidden.iter().find(|p| line.contains(*p)) {
                found.push(format!("{rel}:{}: `{pattern}` in: {}", i + 1, line.trim()));
            }
        }
    }
    found
}

// ── Domain purity ─────────────────────────────────────────────────────────────

#[test]
fn domain_has_no_io_or_outer_layer_imports() {
    let found = violations(
        "domain",
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
    assert!(found.is_empty(), "domain/ must stay pure:\n{}", found.join("\n"));
}

// ── Application boundaries ────────────────────────────────────────────────────

#[test]
fn application_reaches_the_world_only_through_ports() {
    let found = violations(
        "application",
        &[
            "crate::infra",
            "crate::commands",
            "crate::output",
            "std::process::Command",
            "tokio::process",
            "std::fs::",
        ],
    );
    assert!(
        found.is_empty(),
        "application/ must use port traits, not concrete I/O:\n{}",
        found.join("\n")
    );
}

#[test]
fn infra_does_not_depend_on_presentation() {
    let found = violations("infra", &["crate::commands", "crate::output"]);
    assert!(found.is_empty(), "infra/ must not import presentation:\n{}", found.join("\n"));
}

// ── Services take ports as trait bounds ──────────────────────────────────────

#[test]
fn services_never_name_concrete_adapters() {
    let found = violations(
        "application",
        &["VagrantExecutor", "VagrantProvisioner", "TokioCommandRunner", "FsKubeconfigStore"],
    );
    assert!(
        found.is_empty(),
        "application/ must be generic over ports:\n{}",
        found.join("\n")
    );
}
