use clap::Parser;

use obskit::cli::commands::{config, serve};
use obskit::cli::{Cli, Commands, ConfigAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = config::resolve_path(cli.config);

    match cli.command {
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { force } => config::handle_init(force, config_path).await,
            ConfigAction::Show { json } => config::handle_show(config_path, json).await,
            ConfigAction::Validate => config::handle_validate(config_path).await,
        },
        Some(Commands::Serve { port }) => serve::handle_serve(config_path, port).await,
        None => {
            println!("obskit - logging, metrics and tracing bootstrap");
            println!("Use --help to see available commands");
            Ok(())
        }
    }
}
