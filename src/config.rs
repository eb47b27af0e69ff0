//! Configuration parsing and validation.
//!
//! Knowledge Gateway is configured via a TOML file (default
//! `config/kgw.toml`). Every section is optional:
//!
//! ```toml
//! [gateway]
//! manifest = "manifest.json"   # relative to this file
//! store_root = "knowledge"     # one subdirectory per domain
//! default_role = "agent"       # role used when a request names none
//! strict = false               # require enabled domains' directories to exist
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! mcp_path = "/mcp"
//!
//! [mcp]
//! manifest_tool = "get_manifest"
//!
//! [domains.architecture]
//! dir = "architecture"
//! tool = "read_architecture"
//! description = "System architecture notes"
//! include_globs = ["*.md"]
//! ```
//!
//! When `[domains]` is omitted, the six built-in knowledge domains are
//! registered (see [`builtin_domains`]).

use anyhow::{bail, Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default = "builtin_domains")]
    pub domains: BTreeMap<String, DomainConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,
    #[serde(default = "default_role")]
    pub default_role: String,
    #[serde(default)]
    pub strict: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            store_root: default_store_root(),
            default_role: default_role(),
            strict: false,
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("manifest.json")
}
fn default_store_root() -> PathBuf {
    PathBuf::from("knowledge")
}
fn default_role() -> String {
    "agent".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_mcp_path")]
    pub mcp_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            mcp_path: default_mcp_path(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_mcp_path() -> String {
    "/mcp".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct McpConfig {
    #[serde(default = "default_manifest_tool")]
    pub manifest_tool: String,
    /// Server name announced to MCP clients. Defaults to the manifest name.
    #[serde(default)]
    pub server_name: Option<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            manifest_tool: default_manifest_tool(),
            server_name: None,
        }
    }
}

fn default_manifest_tool() -> String {
    "get_manifest".to_string()
}

/// One knowledge domain, keyed by its name in `[domains.<name>]`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DomainConfig {
    /// Subdirectory under `store_root`. Defaults to the domain name.
    #[serde(default)]
    pub dir: Option<String>,
    /// Tool name for the MCP front end. Defaults to `read_<name>`.
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// File-name patterns a document must match.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["*.md".to_string()]
}

impl DomainConfig {
    fn builtin(dir: &str, tool: &str, description: &str) -> Self {
        Self {
            dir: Some(dir.to_string()),
            tool: Some(tool.to_string()),
            description: Some(description.to_string()),
            include_globs: default_include_globs(),
        }
    }

    pub fn dir_for(&self, name: &str) -> String {
        self.dir.clone().unwrap_or_else(|| name.to_string())
    }

    pub fn tool_for(&self, name: &str) -> String {
        self.tool
            .clone()
            .unwrap_or_else(|| format!("read_{}", name.replace('-', "_")))
    }

    pub fn description_for(&self, name: &str) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Returns the {} knowledge base.", name))
    }
}

/// The knowledge domains registered when the config declares none.
pub fn builtin_domains() -> BTreeMap<String, DomainConfig> {
    [
        (
            "architecture",
            DomainConfig::builtin(
                "architecture",
                "read_architecture",
                "Returns the system architecture knowledge base.",
            ),
        ),
        (
            "rules",
            DomainConfig::builtin(
                "rules",
                "read_governance_rules",
                "Returns the active governance rules.",
            ),
        ),
        (
            "standards",
            DomainConfig::builtin(
                "coding-standards",
                "read_coding_standards",
                "Returns the enforced coding standards.",
            ),
        ),
        (
            "decision-model",
            DomainConfig::builtin(
                "decision-model",
                "get_decision_model",
                "Returns the decision lifecycle model, exposure levels, and thresholds.",
            ),
        ),
        (
            "decision-matrix",
            DomainConfig::builtin(
                "decision-matrix",
                "get_decision_matrix",
                "Returns the domain-specific decision matrices.",
            ),
        ),
        (
            "prohibitions",
            DomainConfig::builtin(
                "prohibitions",
                "get_prohibitions",
                "Returns the forbidden actions, tools, and patterns.",
            ),
        ),
    ]
    .into_iter()
    .map(|(name, cfg)| (name.to_string(), cfg))
    .collect()
}

/// Route names a domain may not take.
const RESERVED_DOMAIN_NAMES: &[&str] = &["manifest", "mcp"];

impl Config {
    /// A config rooted at `root`: manifest at `root/manifest.json`, store at
    /// `root/knowledge`, built-in domains.
    pub fn minimal(root: &Path) -> Self {
        Self {
            gateway: GatewayConfig {
                manifest: root.join(default_manifest()),
                store_root: root.join(default_store_root()),
                ..GatewayConfig::default()
            },
            server: ServerConfig::default(),
            mcp: McpConfig::default(),
            domains: builtin_domains(),
        }
    }

    /// Resolves relative manifest and store paths against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        if self.gateway.manifest.is_relative() {
            self.gateway.manifest = base.join(&self.gateway.manifest);
        }
        if self.gateway.store_root.is_relative() {
            self.gateway.store_root = base.join(&self.gateway.store_root);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.default_role.trim().is_empty() {
            bail!("gateway.default_role must not be empty");
        }

        if !self.server.mcp_path.starts_with('/') || self.server.mcp_path == "/" {
            bail!(
                "server.mcp_path must be an absolute sub-path, got '{}'",
                self.server.mcp_path
            );
        }

        if self.mcp.manifest_tool.trim().is_empty() {
            bail!("mcp.manifest_tool must not be empty");
        }

        let mcp_route = self.server.mcp_path.trim_start_matches('/');
        let mut tools: Vec<String> = vec![self.mcp.manifest_tool.clone()];

        for (name, domain) in &self.domains {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
            {
                bail!(
                    "domain name '{}' must be non-empty and use only [a-z0-9_-]",
                    name
                );
            }
            if RESERVED_DOMAIN_NAMES.contains(&name.as_str()) || name == mcp_route {
                bail!("domain name '{}' is reserved", name);
            }

            let dir = domain.dir_for(name);
            if dir.is_empty() || dir.contains("..") || Path::new(&dir).is_absolute() {
                bail!("domains.{}.dir must be a relative subdirectory", name);
            }

            if domain.include_globs.is_empty() {
                bail!("domains.{}.include_globs must not be empty", name);
            }
            for pattern in &domain.include_globs {
                Glob::new(pattern)
                    .with_context(|| format!("domains.{}: invalid glob '{}'", name, pattern))?;
            }

            let tool = domain.tool_for(name);
            if tools.contains(&tool) {
                bail!("tool name '{}' is used more than once", tool);
            }
            tools.push(tool);
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    config.validate()?;

    Ok(config)
}
