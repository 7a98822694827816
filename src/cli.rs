//! CLI struct definitions for the formgate command-line interface.
//!
//! All clap-derived types live here. Command handling lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "formgate",
    version = env!("CARGO_PKG_VERSION"),
    about = "REST persistence gateway for form definitions, form data, drafts and attachments"
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ServeCli {
    /// Configuration file (defaults to $FORMGATE_CONFIG, then ./formgate.toml).
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Listen address, overriding `server.bind`.
    #[clap(long)]
    pub bind: Option<String>,
    /// SQLite database file, overriding `store.path`.
    #[clap(long, conflicts_with = "memory")]
    pub db: Option<PathBuf>,
    /// Keep documents in memory only; nothing survives the process.
    #[clap(long)]
    pub memory: bool,
    /// Increase log verbosity (-v debug, -vv trace). $FORMGATE_LOG takes precedence.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(clap::Args, Debug)]
pub(crate) struct InitDbCli {
    /// Configuration file to read `store.path` from.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// SQLite database file to create, overriding `store.path`.
    #[clap(long)]
    pub db: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ResolveCli {
    /// HTTP method (GET, PUT, POST, DELETE).
    pub method: String,
    /// Request path, e.g. /crud/acme/invoice/data/42/data.xml
    pub path: String,
    /// Location namespace.
    #[clap(long, default_value = "orbeon")]
    pub namespace: String,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run the HTTP gateway
    Serve(ServeCli),
    /// Create the SQLite document schema and exit
    InitDb(InitDbCli),
    /// Show how a request path resolves to a resource, location and tags
    Resolve(ResolveCli),
}
