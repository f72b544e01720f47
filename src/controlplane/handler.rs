//! Cluster Handler - the storage control facade
//!
//! Translates the declarative storage API (enable an object store, start a
//! filesystem, resolve a connection, list nodes) into calls against the
//! secret store, service registry, node inventory and provisioner delegates.
//!
//! The handler keeps no mutable state between calls. Concurrent requests for
//! the same object store converge because an existing certificate secret is
//! treated as already created.

use crate::controlplane::metrics::{
    ControlMetrics, OUTCOME_ERROR, OUTCOME_SUCCESS, OUTCOME_UNIMPLEMENTED,
};
use crate::controlplane::naming::{
    cert_secret_name, object_store_instance_name, rgw_endpoint, CERT_SECRET_KEY,
};
use crate::domain::ports::{
    ClusterInfo, ConnectionInfo, FilesystemRequest, MonitorConfig, Node, NodeInventoryRef,
    ObjectStoreConfig, Placement, ProvisionContext, ProvisionerFactoryRef, SecretStoreRef,
    ServiceRegistryRef,
};
use crate::error::{Error, Result, Subsystem};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument, Span};

// =============================================================================
// Collaborators
// =============================================================================

/// Platform adapters the handler delegates to
#[derive(Clone)]
pub struct HandlerPorts {
    pub secrets: SecretStoreRef,
    pub services: ServiceRegistryRef,
    pub nodes: NodeInventoryRef,
    pub provisioners: ProvisionerFactoryRef,
}

// =============================================================================
// Cluster Handler
// =============================================================================

/// Storage control facade bound to one cluster and namespace
pub struct ClusterHandler {
    cluster: Arc<ClusterInfo>,
    namespace: String,
    version_tag: String,
    ports: HandlerPorts,
    /// Parent span of every operation
    span: Span,
    metrics: Option<ControlMetrics>,
}

impl ClusterHandler {
    /// Create a new handler
    pub fn new(
        cluster: Arc<ClusterInfo>,
        namespace: impl Into<String>,
        version_tag: impl Into<String>,
        ports: HandlerPorts,
    ) -> Self {
        let namespace = namespace.into();
        let span = info_span!("cluster_handler", namespace = %namespace);

        Self {
            cluster,
            namespace,
            version_tag: version_tag.into(),
            ports,
            span,
            metrics: None,
        }
    }

    /// Log under `span` instead of the default `cluster_handler` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Record operation counts and latencies
    pub fn with_metrics(mut self, metrics: ControlMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&ControlMetrics> {
        self.metrics.as_ref()
    }

    /// Identity of the cluster captured at construction
    pub fn cluster_info(&self) -> Arc<ClusterInfo> {
        self.cluster.clone()
    }

    /// Enable an object store.
    ///
    /// An inline certificate without a secret reference is first stored in
    /// `rook-rgw-<name>-cert`; the returned config carries that reference.
    pub async fn enable_object_store(
        &self,
        config: ObjectStoreConfig,
    ) -> Result<ObjectStoreConfig> {
        self.observe("enable_object_store", self.enable_object_store_inner(config))
            .await
    }

    async fn enable_object_store_inner(
        &self,
        mut config: ObjectStoreConfig,
    ) -> Result<ObjectStoreConfig> {
        validate_name("object store", &config.name)?;
        info!("Starting the object store {}", config.name);

        let pending_cert = match (config.inline_certificate(), config.certificate_secret()) {
            (Some(cert), None) => Some(cert.as_bytes().to_vec()),
            _ => None,
        };

        if let Some(cert) = pending_cert {
            let cert_name = cert_secret_name(&config.name);
            let data = BTreeMap::from([(CERT_SECRET_KEY.to_string(), cert)]);

            match self.ports.secrets.create(&self.namespace, &cert_name, data).await {
                Ok(()) => info!("Stored certificate in secret {}", cert_name),
                Err(e) if e.is_already_exists() => {
                    debug!("Certificate secret {} already exists", cert_name)
                }
                Err(e) => {
                    return Err(Error::SecretCreate {
                        name: cert_name,
                        source: Box::new(e),
                    })
                }
            }
            config.certificate_ref = Some(cert_name);
        }

        let ctx = self.provision_context(config.placement.as_ref());
        let delegate = self.ports.provisioners.object_store(ctx, config.clone());
        delegate
            .start()
            .await
            .map_err(|e| Error::ProvisionerFailed {
                subsystem: Subsystem::ObjectStore,
                name: config.name.clone(),
                source: Box::new(e),
            })?;

        Ok(config)
    }

    /// Remove an object store. Not implemented.
    pub async fn remove_object_store(&self, name: &str) -> Result<()> {
        self.observe("remove_object_store", async {
            warn!("Removing object store {} is not implemented", name);
            Err(Error::Unimplemented {
                operation: "remove_object_store",
            })
        })
        .await
    }

    /// Resolve how clients reach the object store `name`
    pub async fn get_object_store_connection_info(&self, name: &str) -> Result<ConnectionInfo> {
        self.observe(
            "get_object_store_connection_info",
            self.connection_info_inner(name),
        )
        .await
    }

    async fn connection_info_inner(&self, name: &str) -> Result<ConnectionInfo> {
        info!("Getting the object store connection info for {}", name);

        let instance = object_store_instance_name(name);
        let service = self
            .ports
            .services
            .get(&self.namespace, &instance)
            .await
            .map_err(|e| Error::ConnectionInfo {
                store: name.to_string(),
                source: Box::new(e),
            })?;

        let info = ConnectionInfo {
            host: instance,
            ip_endpoint: rgw_endpoint(&service.cluster_ip),
        };
        info!("Object store connection: {:?}", info);
        Ok(info)
    }

    /// Start the metadata servers of a filesystem
    pub async fn start_file_system(&self, fs: &FilesystemRequest) -> Result<()> {
        self.observe("start_file_system", self.start_file_system_inner(fs))
            .await
    }

    async fn start_file_system_inner(&self, fs: &FilesystemRequest) -> Result<()> {
        validate_name("file system", &fs.name)?;
        info!("Starting the file system {}", fs.name);

        let ctx = self.provision_context(fs.placement.as_ref());
        let delegate = self.ports.provisioners.file_system(ctx, fs.clone());
        delegate
            .start()
            .await
            .map_err(|e| Error::ProvisionerFailed {
                subsystem: Subsystem::FileSystem,
                name: fs.name.clone(),
                source: Box::new(e),
            })
    }

    /// Remove a filesystem. Not implemented.
    pub async fn remove_file_system(&self, fs: &FilesystemRequest) -> Result<()> {
        self.observe("remove_file_system", async {
            warn!("Removing file system {} is not implemented", fs.name);
            Err(Error::Unimplemented {
                operation: "remove_file_system",
            })
        })
        .await
    }

    /// Monitors of the cluster. Not implemented; never reports an empty map.
    pub async fn get_monitors(&self) -> Result<BTreeMap<String, MonitorConfig>> {
        self.observe("get_monitors", async {
            warn!("Getting monitors is not implemented");
            Err(Error::Unimplemented {
                operation: "get_monitors",
            })
        })
        .await
    }

    /// Cluster member nodes, exactly as the node inventory reports them
    pub async fn get_nodes(&self) -> Result<Vec<Node>> {
        self.observe("get_nodes", async {
            info!("Getting nodes");
            self.ports.nodes.list_nodes().await
        })
        .await
    }

    fn provision_context(&self, placement: Option<&Placement>) -> ProvisionContext {
        ProvisionContext {
            cluster: self.cluster.clone(),
            namespace: self.namespace.clone(),
            version_tag: self.version_tag.clone(),
            placement: placement.cloned().unwrap_or_default(),
        }
    }

    /// Run one operation inside the handler span and record its outcome
    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let span = info_span!(parent: &self.span, "operation", name = operation);
        let result = fut.instrument(span).await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(_) => OUTCOME_SUCCESS,
                Err(e) if e.is_unimplemented() => OUTCOME_UNIMPLEMENTED,
                Err(_) => OUTCOME_ERROR,
            };
            metrics.observe(operation, outcome, started.elapsed());
        }

        result
    }
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(format!("{} name is required", kind)));
    }
    Ok(())
}
