//! # Knowledge Gateway
//!
//! **A manifest-gated, read-only gateway for categorized knowledge documents.**
//!
//! Knowledge Gateway reads document collections (architecture notes,
//! governance rules, coding standards, decision models, prohibitions, ...)
//! from a file-based store and republishes them verbatim through two front
//! ends: a REST API and an MCP tool server. A JSON manifest declares which
//! domains are enabled and which caller roles may read each one.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐
//! │ Manifest │   │    Domain    │
//! │  (JSON)  │   │   Registry   │◀── [domains.*] in kgw.toml
//! └────┬─────┘   └──────┬───────┘
//!      │ validated at   │
//!      │ startup        ▼
//!      │         ┌──────────────┐   ┌─────────────┐
//!      └────────▶│   Gateway    │──▶│   Loader    │──▶ store_root/<dir>/*.md
//!                │ access guard │   └─────────────┘
//!                └──────┬───────┘
//!           ┌───────────┴───────────┐
//!           ▼                       ▼
//!     ┌──────────┐            ┌──────────┐
//!     │   REST   │            │   MCP    │
//!     │  (axum)  │            │  (rmcp)  │
//!     └──────────┘            └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kgw check                         # validate manifest against domains
//! kgw domains                       # list domains and their status
//! kgw read architecture --role agent
//! kgw serve                         # REST + MCP over HTTP
//! kgw stdio                         # MCP over stdio
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`manifest`] | Manifest loading and registry consistency check |
//! | [`loader`] | Knowledge store loader: ordered, fault-isolated directory reads |
//! | [`registry`] | Domain registry and the `DomainLoader` trait |
//! | [`gateway`] | Shared dispatch: resolve → access guard → load |
//! | [`server`] | REST front end (Axum) with the MCP HTTP endpoint nested |
//! | [`mcp`] | MCP tool front end (rmcp) |
//! | [`domains`] | Domain status listing |
//! | [`read`] | `kgw read` command |

pub mod config;
pub mod domains;
pub mod gateway;
pub mod loader;
pub mod manifest;
pub mod mcp;
pub mod read;
pub mod registry;
pub mod server;

pub use gateway::{DomainRequest, Gateway, GatewayError};
pub use knowledge_gateway_core::{
    check_access, AccessDecision, CallerContext, DenyReason, DomainLoad, KnowledgeItem,
    LoadDiagnostic, Manifest,
};
pub use registry::{Domain, DomainLoader, DomainRegistry};
