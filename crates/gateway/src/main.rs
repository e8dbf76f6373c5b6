use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wm_gateway::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Run) => {
            init_tracing();
            let (config, _config_path) = cli::load_config()?;
            cli::run::run(Arc::new(config)).await
        }
        Some(Command::Check { website_id, check_type }) => {
            init_tracing();
            let (config, _config_path) = cli::load_config()?;
            cli::check::run(Arc::new(config), &website_id, &check_type)
        }
        Some(Command::Doctor) => {
            let (config, _config_path) = cli::load_config()?;
            cli::doctor::run(&config)
        }
        Some(Command::Version) => {
            println!("website-monitor {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
