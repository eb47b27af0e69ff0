//! Domain registry.
//!
//! Maps a domain name, the string both protocol front ends use, to the
//! subdirectory it reads and the [`DomainLoader`] that reads it. Adding a
//! knowledge category is one [`register`](DomainRegistry::register) call
//! or one `[domains.<name>]` table in the config file.
//!
//! The registry is populated once at startup and shared read-only
//! (behind an `Arc`) for the life of the process.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                DomainRegistry                │
//! │  architecture ─▶ architecture/   FileLoader  │
//! │  standards    ─▶ coding-standards/ FileLoader│
//! │  playbooks    ─▶ playbooks/      (custom)    │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!           Gateway::read_domain() ← REST / MCP
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use knowledge_gateway_core::{DomainLoad, RegistryError};

use crate::config::Config;
use crate::loader::{domain_dir, FileLoader};

/// Reads one domain directory into knowledge items.
///
/// Implementations never fail as a whole: unreadable files are reported in
/// [`DomainLoad::diagnostics`] and a missing directory is an empty load.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use std::path::Path;
/// use knowledge_gateway::registry::DomainLoader;
/// use knowledge_gateway_core::{DomainLoad, KnowledgeItem};
///
/// struct FixedLoader;
///
/// #[async_trait]
/// impl DomainLoader for FixedLoader {
///     async fn load(&self, _dir: &Path, topic: &str) -> DomainLoad {
///         DomainLoad {
///             items: vec![KnowledgeItem {
///                 file: "fixed.md".to_string(),
///                 topic: topic.to_string(),
///                 content: "always here".to_string(),
///             }],
///             diagnostics: vec![],
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait DomainLoader: Send + Sync {
    /// Loader type identifier shown in `kgw domains`.
    fn kind(&self) -> &str {
        "custom"
    }

    async fn load(&self, dir: &Path, topic: &str) -> DomainLoad;
}

/// A registered knowledge domain.
#[derive(Clone)]
pub struct Domain {
    pub name: String,
    pub subdirectory: String,
    /// Tool name on the MCP front end.
    pub tool: String,
    pub description: String,
    loader: Arc<dyn DomainLoader>,
}

impl Domain {
    pub fn new(
        name: impl Into<String>,
        subdirectory: impl Into<String>,
        loader: Arc<dyn DomainLoader>,
    ) -> Self {
        let name = name.into();
        Self {
            tool: format!("read_{}", name.replace('-', "_")),
            description: format!("Returns the {} knowledge base.", name),
            subdirectory: subdirectory.into(),
            name,
            loader,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn loader(&self) -> &dyn DomainLoader {
        self.loader.as_ref()
    }

    pub fn path(&self, store_root: &Path) -> PathBuf {
        domain_dir(store_root, &self.subdirectory)
    }

    pub async fn load(&self, store_root: &Path) -> DomainLoad {
        self.loader.load(&self.path(store_root), &self.name).await
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("subdirectory", &self.subdirectory)
            .field("tool", &self.tool)
            .field("loader", &self.loader.kind())
            .finish()
    }
}

/// Registration-ordered table of domains.
#[derive(Debug, Default)]
pub struct DomainRegistry {
    domains: Vec<Domain>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry with one [`FileLoader`] domain per `[domains.<name>]`
    /// entry in the config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for (name, cfg) in &config.domains {
            let loader = Arc::new(FileLoader::new(&cfg.include_globs)?);
            let domain = Domain::new(name.clone(), cfg.dir_for(name), loader)
                .with_tool(cfg.tool_for(name))
                .with_description(cfg.description_for(name));
            registry.register_domain(domain)?;
        }
        Ok(registry)
    }

    /// Registers `name` as reading `subdirectory` through `loader`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        subdirectory: impl Into<String>,
        loader: Arc<dyn DomainLoader>,
    ) -> Result<(), RegistryError> {
        self.register_domain(Domain::new(name, subdirectory, loader))
    }

    pub fn register_domain(&mut self, domain: Domain) -> Result<(), RegistryError> {
        if self.domains.iter().any(|d| d.name == domain.name) {
            return Err(RegistryError::DuplicateDomain(domain.name));
        }
        if self.domains.iter().any(|d| d.tool == domain.tool) {
            return Err(RegistryError::DuplicateTool(domain.tool));
        }
        self.domains.push(domain);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Domain, RegistryError> {
        self.domains
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| RegistryError::UnknownDomain(name.to_string()))
    }

    /// Finds the domain served by the MCP tool `tool`.
    pub fn resolve_tool(&self, tool: &str) -> Result<&Domain, RegistryError> {
        self.domains
            .iter()
            .find(|d| d.tool == tool)
            .ok_or_else(|| RegistryError::UnknownTool(tool.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(|d| d.name.as_str())
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }
}
