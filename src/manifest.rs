//! Manifest loading and the startup consistency check.
//!
//! The manifest model itself lives in [`knowledge_gateway_core::manifest`];
//! this module adds the filesystem read and the check against the
//! [`DomainRegistry`]. Both run once at startup and any failure stops the
//! service from starting.

use std::path::Path;

pub use knowledge_gateway_core::manifest::Manifest;
use knowledge_gateway_core::{ManifestConsistencyError, ManifestError};

use crate::registry::DomainRegistry;

/// Reads and parses the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::Missing(path.to_path_buf())
        } else {
            ManifestError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Manifest::from_json_str(&text)
}

/// Checks that every capability names a registered domain and every access
/// rule names a capability.
pub fn validate_against_registry(
    manifest: &Manifest,
    registry: &DomainRegistry,
) -> Result<(), ManifestConsistencyError> {
    manifest.validate_domains(registry.names())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FileLoader;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let err = load_manifest(&tmp.path().join("manifest.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Missing(_)));
    }

    #[test]
    fn test_unparseable_manifest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_manifest(&path).unwrap_err(),
            ManifestError::Invalid(_)
        ));
    }

    #[test]
    fn test_load_and_validate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{ "name": "gw", "version": "1.0.0",
                 "capabilities": { "architecture": true, "playbooks": true },
                 "access": { "architecture": ["agent"] } }"#,
        )
        .unwrap();
        let manifest = load_manifest(&path).unwrap();

        let loader = Arc::new(FileLoader::new(&["*.md"]).unwrap());
        let mut registry = DomainRegistry::new();
        registry
            .register("architecture", "architecture", loader.clone())
            .unwrap();
        assert_eq!(
            validate_against_registry(&manifest, &registry).unwrap_err(),
            ManifestConsistencyError::UnregisteredCapability("playbooks".to_string())
        );

        registry.register("playbooks", "playbooks", loader).unwrap();
        assert!(validate_against_registry(&manifest, &registry).is_ok());
    }
}
