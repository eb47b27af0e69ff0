//! Manifest model.
//!
//! A manifest declares a service's identity, which knowledge domains it
//! exposes (`capabilities`), and which caller roles may read each of them
//! (`access`). It is parsed once at startup and never mutated.
//!
//! ```json
//! {
//!   "name": "logic64-mcp-core",
//!   "version": "1.0.0",
//!   "description": "Architecture and governance knowledge",
//!   "type": "knowledge-server",
//!   "readOnly": true,
//!   "capabilities": { "architecture": true, "rules": true },
//!   "access": { "architecture": ["agent"], "rules": ["agent", "reviewer"] }
//! }
//! ```
//!
//! `name`, `version`, `capabilities`, and `access` are required. Unknown
//! top-level fields are kept so `GET /manifest` republishes the document
//! as written.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ManifestConsistencyError, ManifestError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "readOnly", default = "default_read_only")]
    pub read_only: bool,
    /// Domain name → enabled flag, in declaration order.
    pub capabilities: IndexMap<String, bool>,
    /// Domain name → caller roles allowed to read it, in declaration order.
    pub access: IndexMap<String, Vec<String>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

fn default_read_only() -> bool {
    true
}

impl Manifest {
    /// Parses a manifest from JSON text.
    ///
    /// Fails with [`ManifestError::Invalid`] when the text is not JSON, is not
    /// an object, or lacks a required field.
    pub fn from_json_str(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Whether the capability flag for `domain` is present and `true`.
    pub fn capability_enabled(&self, domain: &str) -> bool {
        self.capabilities.get(domain).copied().unwrap_or(false)
    }

    /// Roles allowed to read `domain`. Empty when the domain has no access entry.
    pub fn allowed_roles(&self, domain: &str) -> &[String] {
        self.access.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checks the manifest against the set of registered domain names.
    ///
    /// Every capability key must name a registered domain, and every access
    /// key must name a capability. The first mismatch, in manifest order,
    /// is returned.
    pub fn validate_domains<'a, I>(&self, registered: I) -> Result<(), ManifestConsistencyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let registered: Vec<&str> = registered.into_iter().collect();

        for capability in self.capabilities.keys() {
            if !registered.contains(&capability.as_str()) {
                return Err(ManifestConsistencyError::UnregisteredCapability(
                    capability.clone(),
                ));
            }
        }

        for domain in self.access.keys() {
            if !self.capabilities.contains_key(domain) {
                return Err(ManifestConsistencyError::AccessWithoutCapability(
                    domain.clone(),
                ));
            }
        }

        Ok(())
    }
}
