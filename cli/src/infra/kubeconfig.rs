//! Filesystem implementation of the `KubeconfigStore` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::KubeconfigStore;
use crate::domain::Host;

/// Writes `kubeconfig-<server>` files into one directory, owner-only.
pub struct FsKubeconfigStore {
    dir: PathBuf,
}

impl FsKubeconfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl KubeconfigStore for FsKubeconfigStore {
    fn write(&self, server: &Host, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create {}", self.dir.display()))?;
        let path = self.dir.join(format!("kubeconfig-{}", server.name()));
        std::fs::write(&path, contents)
            .with_context(|| format!("cannot write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        tracing::info!(path = %path.display(), "kubeconfig written");
        Ok(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("cannot remove {}", path.display()))
    }
}
