//! Node inventory backed by Kubernetes Nodes

use crate::domain::ports::{Node, NodeInventory, NodeState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node as KubeNode;
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::{debug, warn};

const ZONE_LABEL: &str = "topology.kubernetes.io/zone";
const LEGACY_ZONE_LABEL: &str = "failure-domain.beta.kubernetes.io/zone";
const STORAGE_CAPACITY: &str = "ephemeral-storage";

/// Lists cluster nodes through the Kubernetes API
#[derive(Clone)]
pub struct KubeNodeInventory {
    client: Client,
    cluster_name: String,
}

impl KubeNodeInventory {
    pub fn new(client: Client, cluster_name: impl Into<String>) -> Self {
        Self {
            client,
            cluster_name: cluster_name.into(),
        }
    }
}

#[async_trait]
impl NodeInventory for KubeNodeInventory {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes: Api<KubeNode> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::NodeInventory(format!("failed to list nodes: {}", e)))?;

        debug!("Listed {} nodes", list.items.len());
        Ok(list
            .items
            .iter()
            .map(|n| to_node(n, &self.cluster_name))
            .collect())
    }
}

/// Convert a Kubernetes node into the inventory snapshot
pub(crate) fn to_node(node: &KubeNode, cluster_name: &str) -> Node {
    let name = node.metadata.name.clone().unwrap_or_default();
    let status = node.status.as_ref();

    let node_id = status
        .and_then(|s| s.node_info.as_ref())
        .map(|info| info.system_uuid.clone())
        .filter(|uuid| !uuid.is_empty())
        .unwrap_or_else(|| name.clone());

    let address = |kind: &str| {
        status
            .and_then(|s| s.addresses.as_ref())
            .and_then(|addrs| addrs.iter().find(|a| a.type_ == kind))
            .map(|a| a.address.clone())
    };
    let private_ip = address("InternalIP").unwrap_or_default();
    let public_ip = address("ExternalIP").unwrap_or_else(|| private_ip.clone());

    let storage_bytes = status
        .and_then(|s| s.capacity.as_ref())
        .and_then(|c| c.get(STORAGE_CAPACITY))
        .map(|q| {
            parse_quantity(&q.0).unwrap_or_else(|e| {
                warn!("Node {}: {}", name, e);
                0
            })
        })
        .unwrap_or(0);

    let conditions = status
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();
    let ready = conditions
        .iter()
        .any(|c| c.type_ == "Ready" && c.status == "True");
    let last_updated = conditions
        .iter()
        .filter_map(|c| c.last_heartbeat_time.as_ref().map(|t| t.0))
        .max();

    let location = node
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(ZONE_LABEL).or_else(|| l.get(LEGACY_ZONE_LABEL)))
        .cloned()
        .unwrap_or_default();

    Node {
        node_id,
        cluster_name: cluster_name.to_string(),
        public_ip,
        private_ip,
        storage_bytes,
        state: if ready {
            NodeState::Healthy
        } else {
            NodeState::Unhealthy
        },
        location,
        last_updated,
    }
}

/// Parse a Kubernetes quantity (e.g., "100Gi", "500M", "1024") to bytes
pub(crate) fn parse_quantity(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::NodeInventory("empty quantity".into()));
    }

    let num_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num_str, unit_str) = s.split_at(num_end);

    let num: f64 = num_str
        .parse()
        .map_err(|_| Error::NodeInventory(format!("invalid quantity: {}", s)))?;

    // Suffixes are case-sensitive: "m" is milli, "M" is mega
    let multiplier: f64 = match unit_str {
        "" => 1.0,
        "m" => 0.001,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "Pi" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "Ei" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => {
            return Err(Error::NodeInventory(format!(
                "unknown quantity suffix: {}",
                unit_str
            )))
        }
    };

    Ok((num * multiplier) as u64)
}
