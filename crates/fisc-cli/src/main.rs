//! fisc CLI - Budget transparency service
//!
//! Usage:
//!   fisc init                   Initialize database
//!   fisc serve --port 3000      Start web server
//!   fisc import --file data.csv --email who@example.com
//!                               Bulk-import budget data

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve {
            port,
            host,
            dev_secret,
        } => commands::cmd_serve(&cli.db, &host, port, dev_secret).await,
        Commands::Import { file, email } => commands::cmd_import(&cli.db, &file, &email),
    }
}
