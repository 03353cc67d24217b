mod cli;
mod config;
mod engine;
mod error;
mod exporters;
mod listing;
mod loaders;
mod report;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::ReportMixConfig;
use engine::Mixer;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("reportmix=debug")
    } else if cli.quiet {
        EnvFilter::new("reportmix=error")
    } else {
        EnvFilter::new("reportmix=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    info!("ReportMix v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&cli) {
        tracing::error!("{:#}", e);
        std::process::exit(error::exit_code(&e));
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Mix(args) => {
            let config = ReportMixConfig::build(args)?;
            let report = Mixer::new(&config).run()?;
            if !cli.quiet {
                report::terminal::render(&report);
            }
        }
        cli::Commands::Init => {
            config::init_config()?;
        }
        cli::Commands::ListFields => {
            listing::list_fields();
        }
        cli::Commands::ListSources => {
            listing::list_sources();
        }
    }

    Ok(())
}
