//! Runtime configuration for the router and its backends.
//!
//! Every field has a working default, so `ExecConfig::default()` is enough
//! for most callers. A YAML file or `POLYRUN_*` environment variables can
//! override individual fields; the environment always wins.

use crate::errors::ExecError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Endpoint of the remote execution service.
    pub remote_endpoint: String,
    /// Round-trip timeout for remote execution requests, in seconds.
    pub remote_timeout_secs: u64,
    /// Interpreter binary override; discovered on PATH when unset.
    pub python_binary: Option<PathBuf>,
    /// Container runtime binary override; discovered on PATH when unset.
    pub node_binary: Option<PathBuf>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: "http://localhost:3000/run".to_string(),
            remote_timeout_secs: 60,
            python_binary: None,
            node_binary: None,
        }
    }
}

impl ExecConfig {
    /// Loads configuration from a YAML file, then applies environment
    /// overrides on top.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ExecError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExecError::Config(format!("could not read config file {}: {}", path.display(), e))
        })?;
        let mut config: ExecConfig = serde_yaml::from_str(&raw).map_err(|e| {
            ExecError::Config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, no config file involved.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("POLYRUN_REMOTE_ENDPOINT") {
            self.remote_endpoint = endpoint;
        }
        if let Ok(secs) = std::env::var("POLYRUN_REMOTE_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(parsed) => self.remote_timeout_secs = parsed,
                Err(_) => {
                    log::warn!("ignoring invalid POLYRUN_REMOTE_TIMEOUT_SECS value: {}", secs)
                }
            }
        }
        if let Ok(python) = std::env::var("POLYRUN_PYTHON_BINARY") {
            self.python_binary = Some(PathBuf::from(python));
        }
        if let Ok(node) = std::env::var("POLYRUN_NODE_BINARY") {
            self.node_binary = Some(PathBuf::from(node));
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}
