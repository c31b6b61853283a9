use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// `-h` is taken by `--host`, so help is long-only.
#[derive(Debug, Parser)]
#[command(
    name = "inventory-service",
    about = "Inventory service: register items with photos over HTTP",
    version,
    disable_help_flag = true
)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long)]
    pub port: u16,

    /// Directory for item records and photos (created if missing)
    #[arg(short, long)]
    pub cache: PathBuf,

    /// Host or address to bind
    #[arg(short = 'h', long)]
    pub host: String,

    /// TOML file with additional server settings; the flags above win
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}
