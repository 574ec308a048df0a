//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::HarnessConfig;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "CLUSTERVET_CONFIG";

/// Production implementation of `ConfigStore` that reads a YAML file on disk.
///
/// An explicit path (from `--config`) wins over `CLUSTERVET_CONFIG`, which
/// wins over `~/.clustervet/config.yaml`.
#[derive(Debug, Default)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<HarnessConfig> {
        let path = self.path()?;
        if !path.exists() {
            if self.explicit.is_some() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            return Ok(HarnessConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".clustervet").join("config.yaml"))
    }
}
