//! Domain Ports - Core trait definitions for the storage control facade
//!
//! These traits define the boundaries between the facade and the cluster
//! platform. Adapters implement these traits to provide concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Toleration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Cluster Identity
// =============================================================================

/// A single monitor daemon of the storage cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub name: String,
    /// Address of the monitor (e.g., 10.0.0.1:6790)
    pub endpoint: String,
}

/// Identity of the storage cluster the facade controls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    /// Cluster fsid
    pub fsid: String,
    /// Cluster name
    pub name: String,
    /// Monitors by name
    #[serde(default)]
    pub monitors: BTreeMap<String, MonitorConfig>,
}

impl ClusterInfo {
    /// Monitor endpoints in `name=endpoint` form, comma separated
    pub fn mon_endpoints(&self) -> String {
        self.monitors
            .values()
            .map(|m| format!("{}={}", m.name, m.endpoint))
            .collect::<Vec<_>>()
            .join(",")
    }
}

// =============================================================================
// Placement
// =============================================================================

/// Scheduling constraints applied to provisioned workloads.
///
/// The default (empty) placement means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
}

impl Placement {
    pub fn is_empty(&self) -> bool {
        self.node_selector.is_empty() && self.tolerations.is_empty()
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Object store to enable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreConfig {
    /// Name of the object store
    pub name: String,
    /// Inline PEM certificate for the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// Name of an existing secret holding the certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl ObjectStoreConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Inline certificate, if one was given and is non-empty
    pub fn inline_certificate(&self) -> Option<&str> {
        self.certificate.as_deref().filter(|c| !c.is_empty())
    }

    /// Certificate secret reference, if one was given and is non-empty
    pub fn certificate_secret(&self) -> Option<&str> {
        self.certificate_ref.as_deref().filter(|r| !r.is_empty())
    }
}

/// Distributed filesystem to start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemRequest {
    pub name: String,
    #[serde(default)]
    pub metadata_pool: String,
    #[serde(default)]
    pub data_pools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl FilesystemRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// How clients reach a provisioned object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub host: String,
    pub ip_endpoint: String,
}

/// Node health as seen by the cluster platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Healthy => write!(f, "healthy"),
            NodeState::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Cluster member snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: String,
    pub cluster_name: String,
    pub public_ip: String,
    pub private_ip: String,
    /// Storage capacity in bytes
    pub storage_bytes: u64,
    pub state: NodeState,
    #[serde(default)]
    pub location: String,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Registered service as returned by the service registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub name: String,
    pub namespace: String,
    pub cluster_ip: String,
    #[serde(default)]
    pub ports: Vec<u16>,
}

// =============================================================================
// Secret Store Port
// =============================================================================

/// Port for the cluster's key/value secret store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create a secret.
    ///
    /// Returns `Error::ResourceExists` when a secret with that name is
    /// already present.
    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, Vec<u8>>,
    ) -> Result<()>;
}

// =============================================================================
// Service Registry Port
// =============================================================================

/// Port for reading registered services
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Get a service; `Error::ResourceNotFound` when absent
    async fn get(&self, namespace: &str, name: &str) -> Result<ServiceDescriptor>;
}

// =============================================================================
// Node Inventory Port
// =============================================================================

/// Port for listing cluster member nodes
#[async_trait]
pub trait NodeInventory: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

// =============================================================================
// Provisioner Ports
// =============================================================================

/// Everything a provisioner delegate is bound to besides its request
#[derive(Debug, Clone)]
pub struct ProvisionContext {
    pub cluster: Arc<ClusterInfo>,
    pub namespace: String,
    pub version_tag: String,
    pub placement: Placement,
}

/// A started-once delegate that creates cluster resources for one subsystem
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn start(&self) -> Result<()>;
}

/// Builds provisioner delegates per request
pub trait ProvisionerFactory: Send + Sync {
    fn object_store(
        &self,
        ctx: ProvisionContext,
        config: ObjectStoreConfig,
    ) -> Box<dyn Provisioner>;

    fn file_system(&self, ctx: ProvisionContext, request: FilesystemRequest)
        -> Box<dyn Provisioner>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type SecretStoreRef = Arc<dyn SecretStore>;
pub type ServiceRegistryRef = Arc<dyn ServiceRegistry>;
pub type NodeInventoryRef = Arc<dyn NodeInventory>;
pub type ProvisionerFactoryRef = Arc<dyn ProvisionerFactory>;
