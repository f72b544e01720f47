//! Cluster Storage Control
//!
//! Serves the storage control facade over REST, backed by the Kubernetes API
//! or, in standalone mode, by in-memory adapters.

use anyhow::Context;
use clap::Parser;
use prometheus::Registry;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cluster_storage_control::controlplane::kube::{
    KubeNodeInventory, KubeProvisionerFactory, KubeSecretStore, KubeServiceRegistry,
};
use cluster_storage_control::controlplane::memory::{
    InMemoryProvisionerFactory, InMemorySecretStore, InMemoryServiceRegistry,
    StaticNodeInventory,
};
use cluster_storage_control::{
    ApiServer, ApiServerConfig, ClusterHandler, ControlConfig, ControlMetrics, HandlerPorts,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Cluster Storage Control - object store and filesystem control facade
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cluster configuration file (YAML)
    #[arg(long, env = "CONTROL_CONFIG")]
    config: Option<PathBuf>,

    /// Namespace of the storage cluster (overrides the config file)
    #[arg(long, env = "POD_NAMESPACE")]
    namespace: Option<String>,

    /// Image tag of provisioned daemons (overrides the config file)
    #[arg(long, env = "ROOK_VERSION_TAG")]
    version_tag: Option<String>,

    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
    api_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Run in standalone mode (no Kubernetes)
    #[arg(long, env = "STANDALONE")]
    standalone: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let config = load_config(&args)?;

    info!("Starting Cluster Storage Control");
    info!("  Version: {}", cluster_storage_control::VERSION);
    info!("  Cluster: {}", config.cluster.name);
    info!("  Namespace: {}", config.namespace);
    info!("  REST API: {}", args.api_addr);
    info!("  Standalone mode: {}", args.standalone);

    let ports = if args.standalone {
        standalone_ports()
    } else {
        kube_ports(&config).await?
    };

    let metrics = ControlMetrics::new(Registry::new()).context("failed to register metrics")?;
    let handler = ClusterHandler::new(
        Arc::new(config.cluster),
        config.namespace,
        config.version_tag,
        ports,
    )
    .with_metrics(metrics);

    let server = Arc::new(ApiServer::new(
        ApiServerConfig {
            rest_addr: args.api_addr,
        },
        Arc::new(handler),
    ));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    server.run().await.context("API server failed")?;

    info!("Shutdown complete");
    Ok(())
}

// =============================================================================
// Configuration
// =============================================================================

fn load_config(args: &Args) -> anyhow::Result<ControlConfig> {
    let mut config = match &args.config {
        Some(path) => ControlConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ControlConfig::default(),
    };

    if let Some(namespace) = &args.namespace {
        config.namespace = namespace.clone();
    }
    if let Some(tag) = &args.version_tag {
        config.version_tag = tag.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn standalone_ports() -> HandlerPorts {
    let services = InMemoryServiceRegistry::new();
    HandlerPorts {
        secrets: InMemorySecretStore::new(),
        services: services.clone(),
        nodes: Arc::new(StaticNodeInventory::default()),
        provisioners: Arc::new(InMemoryProvisionerFactory::new(services)),
    }
}

async fn kube_ports(config: &ControlConfig) -> anyhow::Result<HandlerPorts> {
    let client = kube::Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    info!("Kubernetes client initialized");

    Ok(HandlerPorts {
        secrets: Arc::new(KubeSecretStore::new(client.clone())),
        services: Arc::new(KubeServiceRegistry::new(client.clone())),
        nodes: Arc::new(KubeNodeInventory::new(
            client.clone(),
            config.cluster.name.clone(),
        )),
        provisioners: Arc::new(KubeProvisionerFactory::new(client)),
    })
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("kube=info".parse()?)
        .add_directive("tower=warn".parse()?)
        .add_directive("tower_http=info".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}
