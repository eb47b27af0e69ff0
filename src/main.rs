//! # Knowledge Gateway CLI (`kgw`)
//!
//! ## Usage
//!
//! ```bash
//! kgw --config ./config/kgw.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kgw check` | Validate the manifest against the registered domains |
//! | `kgw domains` | List domains with capability, roles, and directory status |
//! | `kgw manifest` | Print the manifest as JSON |
//! | `kgw read <domain>` | Print a domain's items as JSON |
//! | `kgw serve` | Start the REST + MCP HTTP server |
//! | `kgw stdio` | Serve MCP over stdin/stdout |
//!
//! Logs go to stderr; set `RUST_LOG` to adjust verbosity.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use knowledge_gateway::{config, domains, mcp, read, server, Gateway};

/// Knowledge Gateway: serve manifest-gated knowledge domains over REST and MCP.
#[derive(Parser)]
#[command(name = "kgw", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kgw.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the manifest and domains and report whether the service can start.
    Check,

    /// List registered domains and their status.
    Domains,

    /// Print the manifest.
    Manifest,

    /// Read one domain through the access guard.
    Read {
        /// Domain name (e.g. `architecture`).
        domain: String,

        /// Caller role. Defaults to `gateway.default_role`.
        #[arg(long)]
        role: Option<String>,
    },

    /// Start the HTTP server (REST routes plus the MCP endpoint).
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Serve MCP over stdin/stdout.
    Stdio,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let gateway = Gateway::bootstrap(&cfg)?;

    match cli.command {
        Commands::Check => {
            let enabled = gateway
                .manifest()
                .capabilities
                .values()
                .filter(|v| **v)
                .count();
            println!(
                "ok: {} {} ({} domains registered, {} enabled)",
                gateway.manifest().name,
                gateway.manifest().version,
                gateway.registry().len(),
                enabled
            );
        }
        Commands::Domains => {
            domains::list_domains(&gateway)?;
        }
        Commands::Manifest => {
            println!("{}", serde_json::to_string_pretty(gateway.manifest())?);
        }
        Commands::Read { domain, role } => {
            read::run_read(&gateway, &domain, role.as_deref()).await?;
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            server::run_server(gateway, &cfg, &bind).await?;
        }
        Commands::Stdio => {
            mcp::run_stdio(gateway, &cfg).await?;
        }
    }

    Ok(())
}
