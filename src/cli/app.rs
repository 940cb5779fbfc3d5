use std::path::PathBuf;

use clap::Parser;

/// Logging, metrics and tracing bootstrap for services
#[derive(Parser, Debug)]
#[command(name = "obskit", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to $OBSKIT_CONFIG or the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Initialize telemetry and serve the metrics endpoint until interrupted
    Serve {
        /// Override the metrics port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize configuration file
    Init {
        /// Overwrite an existing file without asking
        #[arg(short, long)]
        force: bool,
    },
    /// Show effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration
    Validate,
}
