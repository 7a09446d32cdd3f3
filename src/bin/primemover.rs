//! `primemover` CLI.
//!
//! A thin stand-in for the out-of-scope classpath-scanning CLI/build
//! plugin: Rust transformation is automatic on `cargo build`, so there is
//! no artifact directory to write. `check` parses a crate's sources and
//! prints the ordinal table `#[entity]` would generate for it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use primemover::check::check_path;

#[derive(Parser)]
#[command(name = "primemover")]
#[command(about = "Discrete-event simulation kernel and entity-proxy transformer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ordinal table for every #[entity] impl found under a path
    Check {
        /// File or directory to scan
        path: PathBuf,
        /// Emit the table as JSON instead of a plain table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = primemover_otel::init_tracing() {
        eprintln!("warning: failed to initialize tracing: {e}");
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { path, json } => {
            let entries = check_path(&path)?;
            if json {
                let rows: Vec<_> = entries
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "entity": e.entity,
                            "method": e.method,
                            "ordinal": e.ordinal,
                            "descriptor": e.descriptor,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if entries.is_empty() {
                println!("no #[entity] impls found under {}", path.display());
            } else {
                for e in &entries {
                    println!("{:<24} {:<20} ordinal={:<6} ({})", e.entity, e.method, e.ordinal, e.descriptor);
                }
            }
            Ok(())
        }
    }
}
