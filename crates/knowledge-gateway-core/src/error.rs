//! Error taxonomy shared by the gateway and its protocol front ends.
//!
//! Startup errors ([`ManifestError`], [`ManifestConsistencyError`]) are fatal:
//! a service with a broken or inconsistent manifest must refuse to start.
//! [`RegistryError::UnknownDomain`] is recoverable and surfaces as a
//! not-found response. Access denials are modelled as
//! [`DenyReason`](crate::access::DenyReason) values rather than errors.

use std::path::PathBuf;

use thiserror::Error;

/// The manifest could not be read or parsed.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// The manifest declares capabilities or access rules that do not line up
/// with the registered domains.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestConsistencyError {
    #[error("capability '{0}' has no registered domain")]
    UnregisteredCapability(String),
    #[error("access rule for '{0}' does not match any capability")]
    AccessWithoutCapability(String),
}

/// Domain registry lookup and registration failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown domain: {0}")]
    UnknownDomain(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("domain already registered: {0}")]
    DuplicateDomain(String),
    #[error("tool name already registered: {0}")]
    DuplicateTool(String),
}
