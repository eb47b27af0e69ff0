//! Domain reads from the command line.
//!
//! `kgw read <domain>` goes through the same [`Gateway::read_domain`] path as
//! both servers, so it is a quick way to check what a role would receive.
//!
//! ```bash
//! kgw read architecture --role agent
//! ```

use anyhow::Result;

use crate::gateway::Gateway;

/// CLI entry point for `kgw read <domain>`.
///
/// Prints the items as JSON on stdout and any skipped files on stderr.
/// Exits non-zero on an unknown domain or a denied read.
pub async fn run_read(gateway: &Gateway, domain: &str, role: Option<&str>) -> Result<()> {
    let request = gateway.request(domain, role);
    let load = match gateway.read_domain(&request).await {
        Ok(load) => load,
        Err(e) => {
            eprintln!("Error: {}", e);
            println!("{}", serde_json::to_string_pretty(&e.body())?);
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&load.items)?);
    for d in &load.diagnostics {
        eprintln!("skipped {}: {}", d.file, d.message);
    }

    Ok(())
}
