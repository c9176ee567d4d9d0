//! Command line and environment configuration.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "partner-portal")]
#[command(version, about = "Partner configuration portal: REST backend and form renderer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Load partners from a seed JSON document
    Seed(SeedArgs),
    /// Open the database and apply pending migrations
    Migrate(CommonArgs),
}

impl Command {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Serve(args) => &args.common,
            Self::Seed(args) => &args.common,
            Self::Migrate(args) => args,
        }
    }
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to the SQLite database file
    #[arg(long, env = "PORTAL_DB", default_value = "partner_portal.sqlite3")]
    pub database: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PORTAL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory for rolling log files; logs go to stderr when unset
    #[arg(long, env = "PORTAL_LOG_DIR")]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Address to listen on
    #[arg(long, env = "PORTAL_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Timeout for outbound apiCall validation requests, in seconds
    #[arg(long, env = "PORTAL_API_TIMEOUT_SECS", default_value_t = 30)]
    pub api_timeout_secs: u64,
}

#[derive(Debug, Clone, Args)]
pub struct SeedArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Seed document to load
    #[arg(long)]
    pub file: PathBuf,
}

/// Resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database: PathBuf,
    pub api_timeout: Duration,
}

impl From<&ServeArgs> for ServerConfig {
    fn from(args: &ServeArgs) -> Self {
        Self {
            bind: args.bind,
            database: args.common.database.clone(),
            api_timeout: Duration::from_secs(args.api_timeout_secs),
        }
    }
}
