//! shoutstat CLI
//!
//! Serves the status API by default; the other commands are one-shot tools.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;
use shoutstat::{error::Result, models::Config, pipeline};

/// shoutstat - SHOUTcast status page scraper
#[derive(Parser, Debug)]
#[command(
    name = "shoutstat",
    version,
    about = "Republishes a SHOUTcast status page as normalized JSON"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the status API and audio relay (default)
    Serve,

    /// Fetch and extract the upstream page once
    Scrape {
        /// Status page URL (default: upstream.url from config)
        #[arg(long)]
        url: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Extract a status record from a saved HTML file
    Parse {
        /// HTML file to read
        file: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging at `info` until the configuration is read.
///
/// Returns `true` when `--verbose` or `RUST_LOG` already fixed the level.
fn init_logging(verbose: bool) -> bool {
    let fixed = verbose || std::env::var_os("RUST_LOG").is_some();
    let level = if verbose { "debug" } else { "trace" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
    if !fixed {
        log::set_max_level(LevelFilter::Info);
    }
    fixed
}

/// Narrow logging to the level named in the configuration.
fn apply_log_level(level: &str) {
    match level.parse::<LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => log::warn!("Ignoring unknown logging.level {:?}", level),
    }
}

/// Route panics through the logger so they show up next to request logs.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        log::error!("{}", info);
    }));
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level_fixed = init_logging(cli.verbose);
    install_panic_hook();

    let config = Config::load_or_default(&cli.config).with_env();
    if !level_fixed {
        apply_log_level(&config.logging.level);
    }
    log::info!("Using configuration from {}", cli.config.display());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            config.validate()?;
            log::info!("shoutstat starting...");
            pipeline::run_server(&config).await?;
        }

        Command::Scrape { url, pretty } => {
            let record = pipeline::run_scrape(&config, url.as_deref()).await?;
            print_json(&record, pretty)?;
        }

        Command::Parse { file, pretty } => {
            let record = pipeline::run_parse(&file).await?;
            print_json(&record, pretty)?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
