//! # Knowledge Gateway Core
//!
//! Shared, I/O-free logic for Knowledge Gateway: the manifest model and its
//! registry consistency check, knowledge items, the access guard, and the
//! error taxonomy used by every protocol front end.
//!
//! This crate contains no tokio, filesystem, or HTTP dependencies. The
//! loader, registry, and adapters live in the `knowledge-gateway` crate.

pub mod access;
pub mod error;
pub mod item;
pub mod manifest;

pub use access::{check_access, AccessDecision, CallerContext, DenyReason};
pub use error::{ManifestConsistencyError, ManifestError, RegistryError};
pub use item::{DomainLoad, KnowledgeItem, LoadDiagnostic};
pub use manifest::Manifest;
