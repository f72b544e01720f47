//! Control configuration
//!
//! Cluster identity and deployment settings, read from a YAML file. Command
//! line flags override individual fields.

use crate::domain::ports::ClusterInfo;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Namespace the storage cluster runs in
pub const DEFAULT_NAMESPACE: &str = "rook";

/// Image tag of provisioned daemons
pub const DEFAULT_VERSION_TAG: &str = "latest";

/// Settings a [`ClusterHandler`](crate::controlplane::ClusterHandler) is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_version_tag")]
    pub version_tag: String,
    #[serde(default)]
    pub cluster: ClusterInfo,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_version_tag() -> String {
    DEFAULT_VERSION_TAG.to_string()
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            version_tag: default_version_tag(),
            cluster: ClusterInfo::default(),
        }
    }
}

impl ControlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reject settings the handler cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::Configuration("namespace must not be empty".into()));
        }
        if self.version_tag.trim().is_empty() {
            return Err(Error::Configuration("version tag must not be empty".into()));
        }
        for (name, mon) in &self.cluster.monitors {
            if mon.endpoint.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "monitor {} has no endpoint",
                    name
                )));
            }
        }
        Ok(())
    }
}
