//! Secret store backed by Kubernetes Secrets

use super::object_meta;
use crate::domain::ports::SecretStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, PostParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::debug;

/// Creates secrets through the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, Vec<u8>>,
    ) -> Result<()> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = build_secret(namespace, name, data);

        match secrets.create(&PostParams::default(), &secret).await {
            Ok(_) => {
                debug!("Created secret {}/{}", namespace, name);
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::ResourceExists {
                kind: "Secret".into(),
                name: name.into(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn build_secret(namespace: &str, name: &str, data: BTreeMap<String, Vec<u8>>) -> Secret {
    Secret {
        metadata: object_meta(name, namespace, &BTreeMap::new()),
        data: Some(
            data.into_iter()
                .map(|(key, value)| (key, ByteString(value)))
                .collect(),
        ),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::kube::testing::status_client;
    use assert_matches::assert_matches;

    fn cert_data() -> BTreeMap<String, Vec<u8>> {
        [("cert".to_string(), b"pem".to_vec())].into()
    }

    #[tokio::test]
    async fn test_conflict_maps_to_resource_exists() {
        let store = KubeSecretStore::new(status_client(409, "AlreadyExists"));

        let err = store
            .create("rook", "rook-rgw-s3-cert", cert_data())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_matches!(
            err,
            Error::ResourceExists { kind, name } if kind == "Secret" && name == "rook-rgw-s3-cert"
        );
    }

    #[tokio::test]
    async fn test_other_api_errors_pass_through() {
        let store = KubeSecretStore::new(status_client(403, "Forbidden"));

        let err = store.create("rook", "s", cert_data()).await.unwrap_err();
        assert!(!err.is_already_exists());
        assert_matches!(err, Error::Kube(kube::Error::Api(resp)) if resp.code == 403);
    }

    #[test]
    fn test_build_secret() {
        let data = [("cert".to_string(), b"-----BEGIN CERT-----".to_vec())].into();
        let secret = build_secret("rook", "rook-rgw-s3-cert", data);

        assert_eq!(secret.metadata.name.as_deref(), Some("rook-rgw-s3-cert"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("rook"));
        let data = secret.data.unwrap();
        assert_eq!(data.get("cert").unwrap().0, b"-----BEGIN CERT-----".to_vec());
    }
}
