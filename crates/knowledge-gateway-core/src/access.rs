//! Access guard.
//!
//! Decides whether a manifest permits a caller to read a domain. Both
//! protocol front ends call [`check_access`]; neither evaluates policy on
//! its own.
//!
//! # Policy
//!
//! A domain is readable only when
//!
//! 1. its capability flag is present and `true`, and
//! 2. the caller's role is listed in the domain's `access` entry.
//!
//! A missing or empty `access` entry denies everyone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;

/// Identity information a front end extracts from a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerContext {
    pub role: String,
}

impl CallerContext {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

/// Why a read was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The capability flag is `false` or absent.
    CapabilityDisabled,
    /// The domain has no `access` entry, or the entry is empty.
    NoAccessRule,
    /// The caller's role is not in the domain's `access` entry.
    RoleNotPermitted,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::CapabilityDisabled => "capability is disabled",
            DenyReason::NoAccessRule => "no access rule declared",
            DenyReason::RoleNotPermitted => "role is not permitted",
        };
        f.write_str(text)
    }
}

/// Outcome of one access check. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub domain: String,
    pub caller: CallerContext,
    pub allowed: bool,
    pub reason: Option<DenyReason>,
}

impl AccessDecision {
    fn allow(domain: &str, caller: &CallerContext) -> Self {
        Self {
            domain: domain.to_string(),
            caller: caller.clone(),
            allowed: true,
            reason: None,
        }
    }

    fn deny(domain: &str, caller: &CallerContext, reason: DenyReason) -> Self {
        Self {
            domain: domain.to_string(),
            caller: caller.clone(),
            allowed: false,
            reason: Some(reason),
        }
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            None => write!(f, "role '{}' may read '{}'", self.caller.role, self.domain),
            Some(reason) => write!(
                f,
                "role '{}' may not read '{}': {}",
                self.caller.role, self.domain, reason
            ),
        }
    }
}

/// Evaluates the manifest's policy for `domain` and `caller`.
pub fn check_access(manifest: &Manifest, domain: &str, caller: &CallerContext) -> AccessDecision {
    if !manifest.capability_enabled(domain) {
        return AccessDecision::deny(domain, caller, DenyReason::CapabilityDisabled);
    }

    let roles = manifest.allowed_roles(domain);
    if roles.is_empty() {
        return AccessDecision::deny(domain, caller, DenyReason::NoAccessRule);
    }

    if roles.iter().any(|r| *r == caller.role) {
        AccessDecision::allow(domain, caller)
    } else {
        AccessDecision::deny(domain, caller, DenyReason::RoleNotPermitted)
    }
}
