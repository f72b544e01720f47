//! Control Plane Module
//!
//! The cluster handler facade, its platform adapters (Kubernetes and
//! in-memory) and the API that serves it.

pub mod api;
pub mod handler;
pub mod kube;
pub mod memory;
pub mod metrics;
pub mod naming;

pub use api::*;
pub use handler::*;
pub use metrics::*;
