//! Domain status listing.
//!
//! Reports, for every registered domain, whether the manifest enables it,
//! which roles may read it, and whether its directory is present. Used by
//! `kgw domains`.

use anyhow::Result;
use serde::Serialize;

use crate::gateway::Gateway;

#[derive(Debug, Clone, Serialize)]
pub struct DomainStatus {
    pub name: String,
    pub dir: String,
    pub tool: String,
    pub loader: String,
    /// Capability flag from the manifest (`false` when not declared).
    pub enabled: bool,
    pub roles: Vec<String>,
    pub present: bool,
}

pub fn get_domain_statuses(gateway: &Gateway) -> Vec<DomainStatus> {
    let manifest = gateway.manifest();
    gateway
        .registry()
        .domains()
        .iter()
        .map(|d| DomainStatus {
            name: d.name.clone(),
            dir: d.subdirectory.clone(),
            tool: d.tool.clone(),
            loader: d.loader().kind().to_string(),
            enabled: manifest.capability_enabled(&d.name),
            roles: manifest.allowed_roles(&d.name).to_vec(),
            present: d.path(gateway.store_root()).is_dir(),
        })
        .collect()
}

/// CLI entry point for `kgw domains`.
pub fn list_domains(gateway: &Gateway) -> Result<()> {
    let statuses = get_domain_statuses(gateway);

    println!(
        "{:<18} {:<20} {:<8} {:<8} ROLES",
        "DOMAIN", "DIR", "ENABLED", "PRESENT"
    );
    for s in &statuses {
        let roles = if s.roles.is_empty() {
            "(none)".to_string()
        } else {
            s.roles.join(",")
        };
        println!(
            "{:<18} {:<20} {:<8} {:<8} {}",
            s.name, s.dir, s.enabled, s.present, roles
        );
    }

    Ok(())
}
