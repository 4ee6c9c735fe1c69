// src/cli/mod.rs — CLI definition (clap derive)

pub mod discover;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::infra::config::Config;

#[derive(Parser)]
#[command(
    name = "synergy",
    about = "Find automation opportunities in smart-home event history",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ~/.synergy/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG / SYNERGY_LOG are unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mine patterns and synergies, print ranked suggestions as JSON
    Discover {
        /// Event window (JSON array or JSON lines)
        #[arg(long)]
        events: PathBuf,
        /// Device inventory (JSON array)
        #[arg(long)]
        devices: PathBuf,
        /// Existing automations: JSON edge list or automations.yaml
        #[arg(long)]
        relationships: Option<PathBuf>,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Explicit `--config` must exist; otherwise fall back to the default location.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::load_from(p),
        None => Config::load(),
    }
}

pub fn show_config(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
