//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI
//! arguments. The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// fisc - Multi-tenant budget transparency service
#[derive(Parser)]
#[command(name = "fisc")]
#[command(about = "Self-hosted budget transparency service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "fisc.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on (falls back to FISC_PORT, then 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Sign session tokens with a fixed development secret
        ///
        /// WARNING: Only for local development. Without this flag the
        /// server requires FISC_JWT_SECRET to be set.
        #[arg(long)]
        dev_secret: bool,
    },

    /// Bulk-import budget data from a CSV or Excel file
    Import {
        /// File to import (.csv, .xls or .xlsx)
        #[arg(short, long)]
        file: PathBuf,

        /// Email of the user who will own the imported budgets
        #[arg(short, long)]
        email: String,
    },
}
