// src/main.rs — synergy entry point

use clap::Parser;

use synergy_miner::cli::{self, Cli, Commands};
use synergy_miner::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli::load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Discover {
            events,
            devices,
            relationships,
            output,
            pretty,
        } => {
            cli::discover::run_discover(
                config,
                &events,
                &devices,
                relationships.as_deref(),
                output.as_deref(),
                pretty,
            )
            .await
        }
        Commands::Config => cli::show_config(&config),
    }
}
