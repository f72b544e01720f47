//! Cluster Storage Control
//!
//! A control facade for a Ceph-style storage cluster running on Kubernetes:
//! enables S3-compatible object stores, starts filesystem metadata servers,
//! resolves object store endpoints and reports cluster nodes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    REST API (axum)                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                    Cluster Handler                           │
//! │   enable/remove object store · connection info               │
//! │   start/remove filesystem · monitors · nodes                 │
//! ├──────────────┬──────────────┬──────────────┬─────────────────┤
//! │ Secret Store │ Service      │ Node         │ Provisioner     │
//! │              │ Registry     │ Inventory    │ Factory         │
//! ├──────────────┴──────────────┴──────────────┴─────────────────┤
//! │        Kubernetes adapters  |  In-memory adapters            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: Cluster handler, platform adapters and API
//! - [`config`]: Configuration loading and validation
//! - [`domain`]: Core domain types and ports
//! - [`error`]: Error types and handling

pub mod config;
pub mod controlplane;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use config::ControlConfig;

pub use controlplane::{
    ApiServer, ApiServerConfig, ClusterHandler, ControlMetrics, HandlerPorts, RestRouter,
};

pub use domain::ports::{
    ClusterInfo, ConnectionInfo, FilesystemRequest, MonitorConfig, Node, NodeState,
    ObjectStoreConfig, Placement,
};

pub use error::{Error, Result, Subsystem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
