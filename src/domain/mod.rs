//! Domain layer
//!
//! Cluster identity, requests and results of the facade, and the ports the
//! platform adapters implement.

pub mod ports;

pub use ports::*;
