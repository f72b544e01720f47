//! Error types for the storage control facade
//!
//! Collaborator failures are wrapped with the operation and target they
//! belong to. Structured kinds (`ResourceExists`, `ResourceNotFound`,
//! `Unimplemented`) let callers branch without inspecting messages.

use std::fmt;
use thiserror::Error;

/// Storage subsystem a provisioner delegate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    ObjectStore,
    FileSystem,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::ObjectStore => write!(f, "object store"),
            Subsystem::FileSystem => write!(f, "file system"),
        }
    }
}

/// Unified error type for the facade and its adapters
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    // =========================================================================
    // Facade Errors
    // =========================================================================
    #[error("failed to create cert secret {name}: {source}")]
    SecretCreate { name: String, source: Box<Error> },

    #[error("failed to get connection info for object store {store}: {source}")]
    ConnectionInfo { store: String, source: Box<Error> },

    #[error("failed to start {subsystem} provisioner for {name}: {source}")]
    ProvisionerFailed {
        subsystem: Subsystem,
        name: String,
        source: Box<Error>,
    },

    #[error("Operation not implemented: {operation}")]
    Unimplemented { operation: &'static str },

    #[error("Node inventory error: {0}")]
    NodeInventory(String),

    #[error("Request validation failed: {0}")]
    Validation(String),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check whether this error, or any error it wraps, is a not-found
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ResourceNotFound { .. } => true,
            Error::Kube(kube::Error::Api(resp)) => resp.code == 404,
            Error::SecretCreate { source, .. }
            | Error::ConnectionInfo { source, .. }
            | Error::ProvisionerFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check whether this error is an already-exists conflict
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::ResourceExists { .. } => true,
            Error::Kube(kube::Error::Api(resp)) => resp.code == 409,
            _ => false,
        }
    }

    /// Check whether the operation has not been built yet
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, Error::Unimplemented { .. })
    }

    /// Short machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unimplemented { .. } => "not_implemented",
            Error::Configuration(_) => "invalid_configuration",
            Error::Validation(_) => "invalid_request",
            Error::ResourceExists { .. } => "already_exists",
            Error::SecretCreate { .. } => "secret_create_failed",
            Error::ProvisionerFailed { .. } => "provisioner_failed",
            e if e.is_not_found() => "not_found",
            Error::ConnectionInfo { .. } => "connection_info_failed",
            Error::NodeInventory(_) => "node_inventory_failed",
            _ => "internal_error",
        }
    }
}

/// Result type alias for the facade
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> Error {
        Error::Kube(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".into(),
            message: "test".into(),
            reason: "Test".into(),
            code,
        }))
    }

    #[test]
    fn test_not_found_walks_wrappers() {
        let err = Error::ConnectionInfo {
            store: "store-a".into(),
            source: Box::new(Error::ResourceNotFound {
                kind: "Service".into(),
                name: "rook-ceph-rgw-store-a".into(),
            }),
        };
        assert!(err.is_not_found());
        assert_eq!(err.code(), "not_found");

        let err = Error::ConnectionInfo {
            store: "store-a".into(),
            source: Box::new(api_error(500)),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.code(), "connection_info_failed");
    }

    #[test]
    fn test_kube_status_codes() {
        assert!(api_error(404).is_not_found());
        assert!(api_error(409).is_already_exists());
        assert!(!api_error(409).is_not_found());
        assert!(!api_error(503).is_not_found());
        assert!(!api_error(503).is_already_exists());
    }

    #[test]
    fn test_unimplemented_is_distinct() {
        let err = Error::Unimplemented {
            operation: "get_monitors",
        };
        assert!(err.is_unimplemented());
        assert!(!err.is_not_found());
        assert_eq!(err.code(), "not_implemented");
        assert_eq!(err.to_string(), "Operation not implemented: get_monitors");
    }

    #[test]
    fn test_provisioner_failure_message() {
        let err = Error::ProvisionerFailed {
            subsystem: Subsystem::FileSystem,
            name: "myfs".into(),
            source: Box::new(Error::Internal("boom".into())),
        };
        assert_eq!(
            err.to_string(),
            "failed to start file system provisioner for myfs: Internal error: boom"
        );
    }
}
