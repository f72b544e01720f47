//! In-memory platform adapters
//!
//! Back the facade without a Kubernetes cluster (standalone mode) and serve
//! as the doubles in the facade tests.

use crate::controlplane::naming::{
    file_system_instance_name, object_store_instance_name, MDS_APP_NAME, RGW_PORT,
};
use crate::domain::ports::{
    FilesystemRequest, Node, NodeInventory, ObjectStoreConfig, ProvisionContext, Provisioner,
    ProvisionerFactory, SecretStore, ServiceDescriptor, ServiceRegistry,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

type SecretData = BTreeMap<String, Vec<u8>>;

// =============================================================================
// Secret Store
// =============================================================================

/// Secret store keyed by `(namespace, name)`
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<BTreeMap<(String, String), SecretData>>,
}

impl InMemorySecretStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Read back a stored secret
    pub async fn get(&self, namespace: &str, name: &str) -> Option<SecretData> {
        self.secrets
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.secrets.read().await.len()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn create(&self, namespace: &str, name: &str, data: SecretData) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let key = (namespace.to_string(), name.to_string());
        if secrets.contains_key(&key) {
            return Err(Error::ResourceExists {
                kind: "Secret".into(),
                name: name.into(),
            });
        }

        debug!("Created secret {}/{}", namespace, name);
        secrets.insert(key, data);
        Ok(())
    }
}

// =============================================================================
// Service Registry
// =============================================================================

/// Service registry keyed by `(namespace, name)`
#[derive(Default)]
pub struct InMemoryServiceRegistry {
    services: RwLock<BTreeMap<(String, String), ServiceDescriptor>>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add or replace a service
    pub async fn register(&self, service: ServiceDescriptor) {
        let key = (service.namespace.clone(), service.name.clone());
        self.services.write().await.insert(key, service);
    }

    /// Add the service built by `make` unless `namespace/name` is taken.
    ///
    /// Returns whether a service was added; `make` only runs when it is.
    pub async fn register_if_absent<F>(&self, namespace: &str, name: &str, make: F) -> bool
    where
        F: FnOnce() -> ServiceDescriptor,
    {
        let mut services = self.services.write().await;
        match services.entry((namespace.to_string(), name.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(make());
                true
            }
        }
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryServiceRegistry {
    async fn get(&self, namespace: &str, name: &str) -> Result<ServiceDescriptor> {
        self.services
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "Service".into(),
                name: name.into(),
            })
    }
}

// =============================================================================
// Node Inventory
// =============================================================================

/// Fixed node list
#[derive(Debug, Clone, Default)]
pub struct StaticNodeInventory {
    nodes: Vec<Node>,
}

impl StaticNodeInventory {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl NodeInventory for StaticNodeInventory {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.nodes.clone())
    }
}

// =============================================================================
// Provisioners
// =============================================================================

/// Provisioner factory whose object stores register a service with a
/// synthetic cluster IP in the shared registry
pub struct InMemoryProvisionerFactory {
    services: Arc<InMemoryServiceRegistry>,
    next_host: Arc<AtomicU32>,
}

impl InMemoryProvisionerFactory {
    pub fn new(services: Arc<InMemoryServiceRegistry>) -> Self {
        Self {
            services,
            next_host: Arc::new(AtomicU32::new(1)),
        }
    }
}

impl ProvisionerFactory for InMemoryProvisionerFactory {
    fn object_store(
        &self,
        ctx: ProvisionContext,
        config: ObjectStoreConfig,
    ) -> Box<dyn Provisioner> {
        Box::new(InMemoryObjectStore {
            ctx,
            config,
            services: self.services.clone(),
            next_host: self.next_host.clone(),
        })
    }

    fn file_system(
        &self,
        ctx: ProvisionContext,
        request: FilesystemRequest,
    ) -> Box<dyn Provisioner> {
        Box::new(InMemoryFileSystem {
            ctx,
            request,
            services: self.services.clone(),
        })
    }
}

struct InMemoryObjectStore {
    ctx: ProvisionContext,
    config: ObjectStoreConfig,
    services: Arc<InMemoryServiceRegistry>,
    next_host: Arc<AtomicU32>,
}

#[async_trait]
impl Provisioner for InMemoryObjectStore {
    async fn start(&self) -> Result<()> {
        let name = object_store_instance_name(&self.config.name);
        let namespace = &self.ctx.namespace;

        let added = self
            .services
            .register_if_absent(namespace, &name, || {
                let host = self.next_host.fetch_add(1, Ordering::Relaxed);
                let cluster_ip = format!("10.96.{}.{}", (host >> 8) & 0xff, host & 0xff);
                info!("Starting object store {} at {}", name, cluster_ip);

                ServiceDescriptor {
                    name: name.clone(),
                    namespace: namespace.clone(),
                    cluster_ip,
                    ports: vec![RGW_PORT],
                }
            })
            .await;

        if !added {
            debug!("Object store {} already running", name);
        }
        Ok(())
    }
}

struct InMemoryFileSystem {
    ctx: ProvisionContext,
    request: FilesystemRequest,
    services: Arc<InMemoryServiceRegistry>,
}

#[async_trait]
impl Provisioner for InMemoryFileSystem {
    async fn start(&self) -> Result<()> {
        let name = file_system_instance_name(&self.request.name);
        info!("Starting {} for filesystem {}", MDS_APP_NAME, self.request.name);

        // Headless: metadata servers have no cluster IP
        self.services
            .register(ServiceDescriptor {
                name,
                namespace: self.ctx.namespace.clone(),
                cluster_ip: "None".into(),
                ports: Vec::new(),
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ClusterInfo, Placement};
    use assert_matches::assert_matches;

    fn ctx() -> ProvisionContext {
        ProvisionContext {
            cluster: Arc::new(ClusterInfo::default()),
            namespace: "rook".into(),
            version_tag: "v0.5.0".into(),
            placement: Placement::default(),
        }
    }

    #[tokio::test]
    async fn test_secret_create_conflict() {
        let store = InMemorySecretStore::new();
        let data: SecretData = [("cert".to_string(), b"pem".to_vec())].into();

        store.create("rook", "s", data.clone()).await.unwrap();
        let err = store.create("rook", "s", data.clone()).await.unwrap_err();
        assert_matches!(err, Error::ResourceExists { .. });

        // Same name in another namespace is a different secret
        store.create("other", "s", data).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_registry_not_found() {
        let registry = InMemoryServiceRegistry::new();
        let err = registry.get("rook", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_object_store_registers_service_once() {
        let registry = InMemoryServiceRegistry::new();
        let factory = InMemoryProvisionerFactory::new(registry.clone());

        let delegate = factory.object_store(ctx(), ObjectStoreConfig::new("s3"));
        delegate.start().await.unwrap();
        let first = registry.get("rook", "rook-ceph-rgw-s3").await.unwrap();
        assert_eq!(first.cluster_ip, "10.96.0.1");
        assert_eq!(first.ports, vec![RGW_PORT]);

        let delegate = factory.object_store(ctx(), ObjectStoreConfig::new("s3"));
        delegate.start().await.unwrap();
        let second = registry.get("rook", "rook-ceph-rgw-s3").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_allocate_one_address() {
        let registry = InMemoryServiceRegistry::new();
        let factory = Arc::new(InMemoryProvisionerFactory::new(registry.clone()));

        let starts: Vec<_> = (0..8)
            .map(|_| {
                let factory = factory.clone();
                tokio::spawn(async move {
                    let delegate = factory.object_store(ctx(), ObjectStoreConfig::new("s3"));
                    delegate.start().await
                })
            })
            .collect();
        for start in starts {
            start.await.unwrap().unwrap();
        }

        let s3 = registry.get("rook", "rook-ceph-rgw-s3").await.unwrap();
        assert_eq!(s3.cluster_ip, "10.96.0.1");

        // Only one address was consumed by the racing starts
        let delegate = factory.object_store(ctx(), ObjectStoreConfig::new("other"));
        delegate.start().await.unwrap();
        let other = registry.get("rook", "rook-ceph-rgw-other").await.unwrap();
        assert_eq!(other.cluster_ip, "10.96.0.2");
    }

    #[tokio::test]
    async fn test_register_if_absent_keeps_existing() {
        let registry = InMemoryServiceRegistry::new();
        let service = |ip: &str| ServiceDescriptor {
            name: "svc".into(),
            namespace: "rook".into(),
            cluster_ip: ip.into(),
            ports: Vec::new(),
        };

        assert!(registry.register_if_absent("rook", "svc", || service("10.0.0.1")).await);
        assert!(
            !registry
                .register_if_absent("rook", "svc", || panic!("must not build twice"))
                .await
        );
        assert_eq!(registry.get("rook", "svc").await.unwrap().cluster_ip, "10.0.0.1");
    }
}
