//! Shared request dispatch for both protocol front ends.
//!
//! The REST server ([`crate::server`]) and the MCP bridge ([`crate::mcp`])
//! each translate their wire request into a [`DomainRequest`] and hand it to
//! the same [`Gateway`]. The gateway resolves the domain, consults the
//! access guard, and runs the loader. Neither front end carries its own copy
//! of policy or loading logic, so both return the same items and the same
//! decisions for the same request.
//!
//! ```text
//!   GET /{domain}        tools/call read_<domain>
//!         │                       │
//!         └──────┐       ┌────────┘
//!                ▼       ▼
//!              DomainRequest
//!                    │
//!   resolve ──▶ check_access ──▶ load
//!  (404 / not found) (403 / forbidden)
//! ```

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use knowledge_gateway_core::{
    check_access, AccessDecision, CallerContext, DomainLoad, Manifest, ManifestConsistencyError,
    RegistryError,
};

use crate::config::Config;
use crate::manifest::{load_manifest, validate_against_registry};
use crate::registry::{Domain, DomainRegistry};

/// A front-end-neutral request for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRequest {
    pub domain: String,
    pub caller: CallerContext,
}

/// Request-time failures. Startup failures are reported through `anyhow`
/// by [`Gateway::bootstrap`] instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Forbidden(AccessDecision),
}

impl GatewayError {
    /// Machine-readable error code shared by both front ends.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Registry(_) => "not_found",
            GatewayError::Forbidden(_) => "forbidden",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

/// JSON error body: `{ "error": { "code": "forbidden", "message": "..." } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Immutable service state: manifest, domain registry, and store location.
///
/// Cloning is cheap; all clones share the same manifest and registry.
#[derive(Clone)]
pub struct Gateway {
    manifest: Arc<Manifest>,
    registry: Arc<DomainRegistry>,
    store_root: PathBuf,
    default_role: String,
}

impl Gateway {
    /// Builds a gateway after checking the manifest against the registry.
    pub fn new(
        manifest: Manifest,
        registry: DomainRegistry,
        store_root: impl Into<PathBuf>,
        default_role: impl Into<String>,
    ) -> Result<Self, ManifestConsistencyError> {
        validate_against_registry(&manifest, &registry)?;
        Ok(Self {
            manifest: Arc::new(manifest),
            registry: Arc::new(registry),
            store_root: store_root.into(),
            default_role: default_role.into(),
        })
    }

    /// Loads the manifest and domains named by `config` and validates them.
    ///
    /// Any error here must stop the process from serving.
    pub fn bootstrap(config: &Config) -> Result<Self> {
        let manifest = load_manifest(&config.gateway.manifest)?;
        let registry = DomainRegistry::from_config(config)?;

        let gateway = Self::new(
            manifest,
            registry,
            config.gateway.store_root.clone(),
            config.gateway.default_role.clone(),
        )
        .with_context(|| {
            format!(
                "manifest {} is inconsistent with the registered domains",
                config.gateway.manifest.display()
            )
        })?;

        gateway.check_store(config.gateway.strict)?;

        if !gateway.manifest.read_only {
            warn!(
                manifest = %gateway.manifest.name,
                "manifest is not marked readOnly; knowledge is still served read-only"
            );
        }

        info!(
            service = %gateway.manifest.name,
            version = %gateway.manifest.version,
            domains = gateway.registry.len(),
            store = %gateway.store_root.display(),
            "gateway ready"
        );

        Ok(gateway)
    }

    /// Reports enabled capabilities whose directory is absent. In strict mode
    /// this is a startup error.
    fn check_store(&self, strict: bool) -> Result<()> {
        for (name, enabled) in &self.manifest.capabilities {
            if !enabled {
                continue;
            }
            let domain = self.registry.resolve(name)?;
            let dir = domain.path(&self.store_root);
            if dir.is_dir() {
                continue;
            }
            if strict {
                bail!(
                    "strict mode: directory for enabled domain '{}' not found: {}",
                    name,
                    dir.display()
                );
            }
            warn!(domain = %name, dir = %dir.display(), "domain directory missing, serving empty");
        }
        Ok(())
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Builds a request, falling back to the default role when none is given.
    pub fn request(&self, domain: &str, role: Option<&str>) -> DomainRequest {
        let role = role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_role.as_str());
        DomainRequest {
            domain: domain.to_string(),
            caller: CallerContext::new(role),
        }
    }

    /// Resolves the domain and evaluates access without loading anything.
    pub fn check(&self, request: &DomainRequest) -> Result<AccessDecision, GatewayError> {
        self.authorize(request).map(|(_, decision)| decision)
    }

    fn authorize(&self, request: &DomainRequest) -> Result<(&Domain, AccessDecision), GatewayError> {
        let domain = self.registry.resolve(&request.domain)?;
        let decision = check_access(&self.manifest, &domain.name, &request.caller);
        Ok((domain, decision))
    }

    /// Serves one domain: resolve, check access, load.
    pub async fn read_domain(&self, request: &DomainRequest) -> Result<DomainLoad, GatewayError> {
        let (domain, decision) = self.authorize(request)?;
        if !decision.allowed {
            info!(
                domain = %decision.domain,
                role = %decision.caller.role,
                reason = ?decision.reason,
                "access denied"
            );
            return Err(GatewayError::Forbidden(decision));
        }

        let load = domain.load(&self.store_root).await;
        if !load.is_complete() {
            warn!(
                domain = %domain.name,
                skipped = load.diagnostics.len(),
                served = load.items.len(),
                "partial domain load"
            );
        }
        Ok(load)
    }
}
