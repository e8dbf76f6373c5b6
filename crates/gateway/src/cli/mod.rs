pub mod check;
pub mod doctor;
pub mod run;

use clap::{Parser, Subcommand};
use wm_domain::config::Config;

/// website-monitor — multi-tenant website monitoring control plane.
#[derive(Debug, Parser)]
#[command(name = "website-monitor", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the scheduler and queue processor and block until shutdown
    /// (default when no subcommand is given).
    Run,
    /// Enqueue a single manual check against the catalog's queue table.
    Check {
        /// Website id to check.
        website_id: String,
        /// One of: crawl, visual, blur, performance, full, baseline.
        check_type: String,
    },
    /// Diagnostic checks: scheduler lock status, queue depth, recent history.
    Doctor,
    /// Print version information.
    Version,
}

/// Load the configuration from the path named by `WM_CONFIG` (or
/// `config.toml` by default), then apply `WM_`-prefixed environment
/// overrides. Shared by every subcommand so the logic lives in one place.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("WM_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let path = std::path::Path::new(&config_path);
    let config = Config::load(path.exists().then_some(path))?;
    Ok((config, config_path))
}
