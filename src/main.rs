//! # cairn
//!
//! Entry point for the `cairn` command line.
//!
//! The configured `log_level` is the default log filter; `RUST_LOG` still
//! wins. Logs go to stderr, stdout carries only the JSON command output.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cairn::CairnConfig;
use cairn::config::DEFAULT_LOG_LEVEL;
use cairn::cli::Cli;
use cairn::commands::execute_command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = CairnConfig::load(cli.config.as_deref());
    let log_level = loaded
        .as_ref()
        .map_or(DEFAULT_LOG_LEVEL, |config| config.log_level.as_str());
    init_tracing(log_level);

    let config = CairnConfig::resolve(loaded, cli.config.is_some())
        .context("Failed to load configuration")?;

    execute_command(cli.command, &config).await
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
