//! Service registry backed by Kubernetes Services

use crate::domain::ports::{ServiceDescriptor, ServiceRegistry};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::api::Api;
use kube::Client;

/// Reads services through the Kubernetes API
#[derive(Clone)]
pub struct KubeServiceRegistry {
    client: Client,
}

impl KubeServiceRegistry {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceRegistry for KubeServiceRegistry {
    async fn get(&self, namespace: &str, name: &str) -> Result<ServiceDescriptor> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);

        match services.get(name).await {
            Ok(service) => service_descriptor(namespace, name, &service),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(Error::ResourceNotFound {
                kind: "Service".into(),
                name: name.into(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Convert a Service into a descriptor; a service without a cluster IP yet
/// cannot be reached and is reported as not found
pub(crate) fn service_descriptor(
    namespace: &str,
    name: &str,
    service: &Service,
) -> Result<ServiceDescriptor> {
    let spec = service.spec.as_ref();
    let cluster_ip = spec
        .and_then(|s| s.cluster_ip.clone())
        .filter(|ip| !ip.is_empty())
        .ok_or_else(|| Error::ResourceNotFound {
            kind: "ClusterIP".into(),
            name: name.into(),
        })?;

    let ports = spec
        .and_then(|s| s.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .filter_map(|p| u16::try_from(p.port).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(ServiceDescriptor {
        name: name.to_string(),
        namespace: namespace.to_string(),
        cluster_ip,
        ports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::kube::testing::status_client;
    use assert_matches::assert_matches;
    use k8s_openapi::api::core::v1::{ServicePort, ServiceSpec};

    #[tokio::test]
    async fn test_missing_service_maps_to_not_found() {
        let registry = KubeServiceRegistry::new(status_client(404, "NotFound"));

        let err = registry.get("rook", "rook-ceph-rgw-s3").await.unwrap_err();
        assert!(err.is_not_found());
        assert_matches!(
            err,
            Error::ResourceNotFound { kind, name } if kind == "Service" && name == "rook-ceph-rgw-s3"
        );
    }

    #[tokio::test]
    async fn test_server_error_is_not_not_found() {
        let registry = KubeServiceRegistry::new(status_client(503, "ServiceUnavailable"));

        let err = registry.get("rook", "rook-ceph-rgw-s3").await.unwrap_err();
        assert!(!err.is_not_found());
        assert_matches!(err, Error::Kube(kube::Error::Api(resp)) if resp.code == 503);
    }

    #[test]
    fn test_service_descriptor() {
        let service = Service {
            spec: Some(ServiceSpec {
                cluster_ip: Some("10.0.0.5".into()),
                ports: Some(vec![ServicePort {
                    port: 53390,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let desc = service_descriptor("rook", "rook-ceph-rgw-s3", &service).unwrap();
        assert_eq!(desc.cluster_ip, "10.0.0.5");
        assert_eq!(desc.ports, vec![53390]);
        assert_eq!(desc.namespace, "rook");
    }

    #[test]
    fn test_service_without_cluster_ip() {
        let err = service_descriptor("rook", "pending", &Service::default()).unwrap_err();
        assert!(err.is_not_found());
    }
}
