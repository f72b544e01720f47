//! REST API Handlers
//!
//! Exposes the storage control facade over HTTP: cluster identity, nodes,
//! monitors, object stores and filesystems.

use crate::controlplane::handler::ClusterHandler;
use crate::domain::ports::{FilesystemRequest, ObjectStoreConfig};
use crate::error::Error;
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

// =============================================================================
// Response Types
// =============================================================================

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiErrorResponse {
    fn status(err: &Error) -> StatusCode {
        match err {
            Error::Unimplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Error::Configuration(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            // Wrapped 404s from provisioning stay server errors
            Error::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConnectionInfo { .. } if err.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = ApiErrorResponse::status(&self);
        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            error!("Request failed: {}", self);
        }

        let details = match &self {
            Error::SecretCreate { source, .. }
            | Error::ConnectionInfo { source, .. }
            | Error::ProvisionerFailed { source, .. } => Some(source.to_string()),
            _ => None,
        };

        (
            status,
            Json(ApiErrorResponse {
                error: self.code().into(),
                message: self.to_string(),
                details,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    handler: Arc<ClusterHandler>,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(handler: Arc<ClusterHandler>) -> Self {
        Self { handler }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            handler: self.handler,
        };

        Router::new()
            // Cluster endpoints
            .route("/info", get(get_cluster_info))
            .route("/node", get(get_nodes))
            .route("/mon", get(get_monitors))
            // Object store endpoints
            .route("/objectstore", post(enable_object_store))
            .route("/objectstore/:name", delete(remove_object_store))
            .route(
                "/objectstore/:name/connectioninfo",
                get(get_object_store_connection_info),
            )
            // Filesystem endpoints
            .route("/filesystem", post(start_file_system))
            .route("/filesystem", delete(remove_file_system))
            // Operational endpoints
            .route("/metrics", get(metrics))
            .route("/healthz", get(health_check))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    handler: Arc<ClusterHandler>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn get_cluster_info(State(state): State<AppState>) -> impl IntoResponse {
    let cluster = state.handler.cluster_info();
    (StatusCode::OK, Json((*cluster).clone()))
}

async fn get_nodes(State(state): State<AppState>) -> Response {
    match state.handler.get_nodes().await {
        Ok(nodes) => (StatusCode::OK, Json(nodes)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_monitors(State(state): State<AppState>) -> Response {
    match state.handler.get_monitors().await {
        Ok(monitors) => (StatusCode::OK, Json(monitors)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Enable an object store; responds with the effective config
async fn enable_object_store(
    State(state): State<AppState>,
    Json(config): Json<ObjectStoreConfig>,
) -> Response {
    info!("Enabling object store: {}", config.name);

    match state.handler.enable_object_store(config).await {
        Ok(effective) => (StatusCode::ACCEPTED, Json(effective)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn remove_object_store(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.handler.remove_object_store(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_object_store_connection_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.handler.get_object_store_connection_info(&name).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn start_file_system(
    State(state): State<AppState>,
    Json(request): Json<FilesystemRequest>,
) -> Response {
    info!("Starting file system: {}", request.name);

    match state.handler.start_file_system(&request).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn remove_file_system(
    State(state): State<AppState>,
    Json(request): Json<FilesystemRequest>,
) -> Response {
    match state.handler.remove_file_system(&request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Prometheus text exposition of the handler metrics
async fn metrics(State(state): State<AppState>) -> Response {
    let Some(metrics) = state.handler.metrics() else {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    };

    match metrics.render() {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::handler::HandlerPorts;
    use crate::controlplane::memory::{
        InMemoryProvisionerFactory, InMemorySecretStore, InMemoryServiceRegistry,
        StaticNodeInventory,
    };
    use crate::controlplane::metrics::ControlMetrics;
    use crate::domain::ports::{ClusterInfo, ConnectionInfo, MonitorConfig, Node, NodeState};
    use axum::body::Body;
    use axum::http::Request;
    use prometheus::Registry;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    fn router() -> Router {
        let services = InMemoryServiceRegistry::new();
        let cluster = ClusterInfo {
            fsid: "fsid-1".into(),
            name: "rookcluster".into(),
            monitors: BTreeMap::from([(
                "mon0".to_string(),
                MonitorConfig {
                    name: "mon0".into(),
                    endpoint: "10.0.0.1:6790".into(),
                },
            )]),
        };
        let nodes = vec![Node {
            node_id: "node-a".into(),
            cluster_name: "rookcluster".into(),
            public_ip: "1.2.3.4".into(),
            private_ip: "10.1.0.4".into(),
            storage_bytes: 1024,
            state: NodeState::Healthy,
            location: String::new(),
            last_updated: None,
        }];

        let handler = ClusterHandler::new(
            Arc::new(cluster),
            "rook",
            "v0.5.1",
            HandlerPorts {
                secrets: InMemorySecretStore::new(),
                services: services.clone(),
                nodes: Arc::new(StaticNodeInventory::new(nodes)),
                provisioners: Arc::new(InMemoryProvisionerFactory::new(services)),
            },
        )
        .with_metrics(ControlMetrics::new(Registry::new()).unwrap());

        RestRouter::new(Arc::new(handler)).build()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_cluster_info() {
        let (status, body) = send(router(), get_req("/info")).await;
        assert_eq!(status, StatusCode::OK);

        let info: ClusterInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(info.name, "rookcluster");
        assert_eq!(info.monitors.len(), 1);
    }

    #[tokio::test]
    async fn test_nodes() {
        let (status, body) = send(router(), get_req("/node")).await;
        assert_eq!(status, StatusCode::OK);

        let nodes: Vec<Node> = serde_json::from_slice(&body).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_id, "node-a");
    }

    #[tokio::test]
    async fn test_unimplemented_routes_return_501() {
        let router = router();

        let (status, body) = send(router.clone(), get_req("/mon")).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        let err: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "not_implemented");

        let req = Request::builder()
            .method("DELETE")
            .uri("/objectstore/s3")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(router.clone(), req).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

        let req = json_req("DELETE", "/filesystem", serde_json::json!({"name": "myfs"}));
        let (status, _) = send(router, req).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_enable_object_store_then_connect() {
        let router = router();

        let req = json_req(
            "POST",
            "/objectstore",
            serde_json::json!({"name": "s3", "certificate": "PEM"}),
        );
        let (status, body) = send(router.clone(), req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let effective: ObjectStoreConfig = serde_json::from_slice(&body).unwrap();
        assert_eq!(effective.certificate_ref.as_deref(), Some("rook-rgw-s3-cert"));

        let req = get_req("/objectstore/s3/connectioninfo");
        let (status, body) = send(router.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        let info: ConnectionInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(info.host, "rook-ceph-rgw-s3");
        assert!(info.ip_endpoint.ends_with(":53390"));

        let (status, body) = send(router, get_req("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("storage_control_operations_total"));
    }

    #[tokio::test]
    async fn test_missing_object_store_is_404() {
        let req = get_req("/objectstore/nope/connectioninfo");
        let (status, body) = send(router(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let err: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "not_found");
        assert!(err.details.is_some());
    }

    #[tokio::test]
    async fn test_provisioning_not_found_is_500() {
        use crate::controlplane::kube::{testing::status_client, KubeProvisionerFactory};

        let services = InMemoryServiceRegistry::new();
        let handler = ClusterHandler::new(
            Arc::new(ClusterInfo::default()),
            "missing-namespace",
            "v0.5.1",
            HandlerPorts {
                secrets: InMemorySecretStore::new(),
                services,
                nodes: Arc::new(StaticNodeInventory::default()),
                provisioners: Arc::new(KubeProvisionerFactory::new(status_client(
                    404, "NotFound",
                ))),
            },
        );
        let router = RestRouter::new(Arc::new(handler)).build();

        let req = json_req("POST", "/objectstore", serde_json::json!({"name": "s3"}));
        let (status, body) = send(router, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "provisioner_failed");
    }

    #[test]
    fn test_status_mapping() {
        let missing = || {
            Box::new(Error::ResourceNotFound {
                kind: "Service".into(),
                name: "rook-ceph-rgw-s3".into(),
            })
        };

        let lookup = Error::ConnectionInfo {
            store: "s3".into(),
            source: missing(),
        };
        assert_eq!(ApiErrorResponse::status(&lookup), StatusCode::NOT_FOUND);

        let provisioning = Error::ProvisionerFailed {
            subsystem: crate::error::Subsystem::FileSystem,
            name: "myfs".into(),
            source: missing(),
        };
        assert_eq!(
            ApiErrorResponse::status(&provisioning),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let secret = Error::SecretCreate {
            name: "rook-rgw-s3-cert".into(),
            source: missing(),
        };
        assert_eq!(
            ApiErrorResponse::status(&secret),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_start_file_system() {
        let req = json_req(
            "POST",
            "/filesystem",
            serde_json::json!({"name": "myfs", "dataPools": ["data0"]}),
        );
        let (status, _) = send(router(), req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_empty_name_is_400() {
        let req = json_req("POST", "/filesystem", serde_json::json!({"name": ""}));
        let (status, body) = send(router(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let err: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "invalid_request");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(router(), get_req("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }
}
