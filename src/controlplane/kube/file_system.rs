//! Filesystem Provisioner
//!
//! Starts the metadata server for a distributed filesystem.

use super::{create_if_absent, rook_image, single_replica_deployment, CONFIG_DIR};
use crate::controlplane::naming::{file_system_instance_name, MDS_APP_NAME};
use crate::domain::ports::{FilesystemRequest, ProvisionContext, Provisioner};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use kube::api::Api;
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Provisions the metadata server of one filesystem
pub struct FileSystemProvisioner {
    client: Client,
    ctx: ProvisionContext,
    request: FilesystemRequest,
}

impl FileSystemProvisioner {
    pub fn new(client: Client, ctx: ProvisionContext, request: FilesystemRequest) -> Self {
        Self {
            client,
            ctx,
            request,
        }
    }
}

pub(crate) fn mds_deployment(ctx: &ProvisionContext, request: &FilesystemRequest) -> Deployment {
    let labels = BTreeMap::from([
        ("app".to_string(), MDS_APP_NAME.to_string()),
        ("rook_file_system".to_string(), request.name.clone()),
    ]);

    let mut args = vec![
        "mds".to_string(),
        format!("--config-dir={}", CONFIG_DIR),
        format!("--cluster-name={}", ctx.cluster.name),
        format!("--mon-endpoints={}", ctx.cluster.mon_endpoints()),
        format!("--filesystem={}", request.name),
    ];
    if !request.metadata_pool.is_empty() {
        args.push(format!("--metadata-pool={}", request.metadata_pool));
    }
    if !request.data_pools.is_empty() {
        args.push(format!("--data-pools={}", request.data_pools.join(",")));
    }

    let container = Container {
        name: MDS_APP_NAME.into(),
        image: Some(rook_image(&ctx.version_tag)),
        args: Some(args),
        ..Default::default()
    };

    single_replica_deployment(
        &file_system_instance_name(&request.name),
        &ctx.namespace,
        labels,
        container,
        Vec::new(),
        &ctx.placement,
    )
}

#[async_trait]
impl Provisioner for FileSystemProvisioner {
    async fn start(&self) -> Result<()> {
        let name = file_system_instance_name(&self.request.name);
        info!("Starting metadata server {}", name);

        let deployments: Api<Deployment> =
            Api::namespaced(self.client.clone(), &self.ctx.namespace);
        let deployment = mds_deployment(&self.ctx, &self.request);
        let created = create_if_absent(&deployments, &deployment).await?;
        if !created {
            debug!("Metadata server {} already exists", name);
        }
        Ok(())
    }
}
