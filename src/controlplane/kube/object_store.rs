//! Object Store Provisioner
//!
//! Starts an S3-compatible gateway for one object store: a ClusterIP
//! Service under the instance name and a single-replica Deployment.

use super::{create_if_absent, object_meta, rook_image, single_replica_deployment, CONFIG_DIR};
use crate::controlplane::naming::{
    object_store_instance_name, CERT_SECRET_KEY, RGW_APP_NAME, RGW_PORT,
};
use crate::domain::ports::{ObjectStoreConfig, ProvisionContext, Provisioner};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, SecretVolumeSource, Service, ServicePort, ServiceSpec, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::Api;
use kube::Client;
use std::collections::BTreeMap;
use tracing::info;

const CERT_VOLUME: &str = "rgw-cert";
const CERT_MOUNT_PATH: &str = "/etc/rook/private";

/// Provisions the gateway for a single object store
pub struct ObjectStoreProvisioner {
    client: Client,
    ctx: ProvisionContext,
    config: ObjectStoreConfig,
}

impl ObjectStoreProvisioner {
    pub fn new(client: Client, ctx: ProvisionContext, config: ObjectStoreConfig) -> Self {
        Self {
            client,
            ctx,
            config,
        }
    }
}

fn labels(config: &ObjectStoreConfig) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), RGW_APP_NAME.to_string()),
        ("rook_object_store".to_string(), config.name.clone()),
    ])
}

/// ClusterIP service fronting the gateway
pub(crate) fn gateway_service(ctx: &ProvisionContext, config: &ObjectStoreConfig) -> Service {
    let labels = labels(config);
    Service {
        metadata: object_meta(
            &object_store_instance_name(&config.name),
            &ctx.namespace,
            &labels,
        ),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".into()),
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                name: Some("rgw".into()),
                port: i32::from(RGW_PORT),
                target_port: Some(IntOrString::Int(i32::from(RGW_PORT))),
                protocol: Some("TCP".into()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Gateway deployment, mounting the certificate secret when one is referenced
pub(crate) fn gateway_deployment(ctx: &ProvisionContext, config: &ObjectStoreConfig) -> Deployment {
    let name = object_store_instance_name(&config.name);
    let mut args = vec![
        "rgw".to_string(),
        format!("--config-dir={}", CONFIG_DIR),
        format!("--cluster-name={}", ctx.cluster.name),
        format!("--mon-endpoints={}", ctx.cluster.mon_endpoints()),
        format!("--rgw-name={}", config.name),
        format!("--rgw-port={}", RGW_PORT),
        format!("--rgw-host={}", name),
    ];

    let mut volumes = Vec::new();
    let mut mounts = Vec::new();
    if let Some(secret) = config.certificate_secret() {
        args.push(format!("--rgw-cert={}/{}", CERT_MOUNT_PATH, CERT_SECRET_KEY));
        volumes.push(Volume {
            name: CERT_VOLUME.into(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: CERT_VOLUME.into(),
            mount_path: CERT_MOUNT_PATH.into(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    let container = Container {
        name: RGW_APP_NAME.into(),
        image: Some(rook_image(&ctx.version_tag)),
        args: Some(args),
        ports: Some(vec![ContainerPort {
            container_port: i32::from(RGW_PORT),
            ..Default::default()
        }]),
        volume_mounts: (!mounts.is_empty()).then_some(mounts),
        ..Default::default()
    };

    single_replica_deployment(
        &name,
        &ctx.namespace,
        labels(config),
        container,
        volumes,
        &ctx.placement,
    )
}

#[async_trait]
impl Provisioner for ObjectStoreProvisioner {
    async fn start(&self) -> Result<()> {
        let name = object_store_instance_name(&self.config.name);
        info!("Starting object store gateway {}", name);

        let services: Api<Service> = Api::namespaced(self.client.clone(), &self.ctx.namespace);
        let deployments: Api<Deployment> =
            Api::namespaced(self.client.clone(), &self.ctx.namespace);
        let service = gateway_service(&self.ctx, &self.config);
        let deployment = gateway_deployment(&self.ctx, &self.config);

        let (svc_created, dep_created) = futures::try_join!(
            create_if_absent(&services, &service),
            create_if_absent(&deployments, &deployment),
        )?;

        info!(
            "Object store gateway {} ready (service created: {}, deployment created: {})",
            name, svc_created, dep_created
        );
        Ok(())
    }
}
