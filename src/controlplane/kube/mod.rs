//! Kubernetes Platform Adapters
//!
//! Implements the domain ports against the Kubernetes API:
//! - Secrets: certificate storage
//! - Services: object store endpoint lookup
//! - Nodes: cluster member inventory
//! - Deployments/Services: object store and filesystem provisioning

pub mod file_system;
pub mod nodes;
pub mod object_store;
pub mod secrets;
pub mod services;

pub use file_system::*;
pub use nodes::*;
pub use object_store::*;
pub use secrets::*;
pub use services::*;

use crate::domain::ports::{
    FilesystemRequest, ObjectStoreConfig, Placement, ProvisionContext, Provisioner,
    ProvisionerFactory,
};
use crate::error::Result;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, Volume};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, PostParams};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Label marking resources this component created
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "cluster-storage-control";

/// Directory daemons keep their generated config in
pub const CONFIG_DIR: &str = "/var/lib/rook";

/// Factory building Kubernetes-backed provisioner delegates
#[derive(Clone)]
pub struct KubeProvisionerFactory {
    client: Client,
}

impl KubeProvisionerFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ProvisionerFactory for KubeProvisionerFactory {
    fn object_store(
        &self,
        ctx: ProvisionContext,
        config: ObjectStoreConfig,
    ) -> Box<dyn Provisioner> {
        Box::new(ObjectStoreProvisioner::new(self.client.clone(), ctx, config))
    }

    fn file_system(
        &self,
        ctx: ProvisionContext,
        request: FilesystemRequest,
    ) -> Box<dyn Provisioner> {
        Box::new(FileSystemProvisioner::new(self.client.clone(), ctx, request))
    }
}

/// Create `obj`, treating a 409 conflict as already present.
///
/// Returns whether the object was newly created.
pub(crate) async fn create_if_absent<K>(api: &Api<K>, obj: &K) -> Result<bool>
where
    K: kube::Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    match api.create(&PostParams::default(), obj).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Metadata for a namespaced object owned by this component
pub(crate) fn object_meta(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> ObjectMeta {
    let mut labels = labels.clone();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());

    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(labels),
        ..Default::default()
    }
}

/// Single-replica deployment running `container`, scheduled per `placement`
pub(crate) fn single_replica_deployment(
    name: &str,
    namespace: &str,
    labels: BTreeMap<String, String>,
    container: Container,
    volumes: Vec<Volume>,
    placement: &Placement,
) -> Deployment {
    let pod_spec = PodSpec {
        containers: vec![container],
        volumes: (!volumes.is_empty()).then_some(volumes),
        node_selector: (!placement.node_selector.is_empty())
            .then(|| placement.node_selector.clone()),
        tolerations: (!placement.tolerations.is_empty()).then(|| placement.tolerations.clone()),
        ..Default::default()
    };

    Deployment {
        metadata: object_meta(name, namespace, &labels),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(name.to_string()),
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Container image for a version tag
pub(crate) fn rook_image(version_tag: &str) -> String {
    format!("rook/rook:{}", version_tag)
}

/// Clients whose API server answers every request with one `Status`
#[cfg(test)]
pub(crate) mod testing {
    use hyper::{Body, Request, Response};
    use kube::Client;

    pub(crate) fn status_client(code: u16, reason: &str) -> Client {
        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("test {}", reason),
            "reason": reason,
            "code": code,
        })
        .to_string();

        let service = tower::service_fn(move |_req: Request<Body>| {
            let body = body.clone();
            async move {
                Response::builder()
                    .status(code)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
            }
        });
        Client::new(service, "rook")
    }
}
