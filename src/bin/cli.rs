//! Sprout Monitor CLI
//!
//! Local execution entry point, suitable for cron or a systemd timer.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sprout_monitor::{
    error::Result,
    models::Config,
    pipeline,
    services::HttpFetcher,
};

/// Sprout Monitor - incremental announcement crawler
#[derive(Parser, Debug)]
#[command(
    name = "sprout-monitor",
    version,
    about = "Collect new announcements into per-target CSV stores"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl targets and append new records
    Run {
        /// Only crawl the target with this name
        #[arg(long)]
        target: Option<String>,
    },

    /// Validate the configuration file
    Validate,

    /// Show store statistics and the last run report
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run { target } => {
            let config = Config::load_validated(&cli.config)?;
            log::info!("Loaded configuration from {}", cli.config.display());

            let fetcher = HttpFetcher::new(&config.crawler)?;
            let summary = pipeline::run_crawler(&config, &fetcher, target.as_deref()).await?;
            summary.print();

            match pipeline::write_report(&config.storage, &summary).await {
                Ok(path) => log::info!("Run report saved to {}", path.display()),
                Err(e) => log::warn!("Could not save run report: {e}"),
            }

            if summary.any_completed() {
                Ok(ExitCode::SUCCESS)
            } else {
                log::error!("No target completed");
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Validate => {
            pipeline::run_validate(&cli.config)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Info => {
            let config = Config::load_validated(&cli.config)?;
            pipeline::run_info(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
