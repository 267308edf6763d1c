//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cairn - reconciliation ledger for search clusters
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(version)]
#[command(about = "Run reconciliation passes and track node pool configuration drift")]
#[command(
    long_about = "cairn runs one reconciliation pass over a declared search cluster, aggregates the generated configuration, fingerprints every node pool and merges component statuses into a persisted cluster status."
)]
pub struct Cli {
    /// Configuration file (defaults to ./cairn.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one reconciliation pass and print the report
    Pass {
        /// Cluster definition (YAML)
        #[arg(short, long)]
        cluster: PathBuf,

        /// Directory holding persisted cluster status
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Compute everything but write nothing
        #[arg(short, long, default_value_t = false)]
        dry_run: bool,
    },

    /// Show the persisted status of a cluster
    Status {
        /// Cluster definition (YAML)
        #[arg(short, long)]
        cluster: PathBuf,

        /// Directory holding persisted cluster status
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
}
