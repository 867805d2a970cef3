//! sciharvest - bulk paper metadata and full-text harvester
//!
//! Resolves DOIs, titles and free-text queries against scholarly search APIs,
//! downloads the PDFs and extracts their text into a Parquet dataset.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod input;
mod signal;

use config::Config;

#[derive(Parser)]
#[command(name = "sciharvest")]
#[command(about = "Bulk paper metadata and full-text harvester")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./sciharvest.toml or ~/.config/sciharvest/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve, download and extract every identifier in a list
    Harvest(cmd::harvest::HarvestArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(sciharvest_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    sciharvest_core::init_logging(quiet, cli.debug, multi);

    let config = match cli.config {
        Some(path) => Config::from_file(&path),
        None => Config::load(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            log::error!("Configuration error: {e:#}");
            return ExitCode::from(2);
        }
    };

    match cli.command {
        Command::Harvest(args) => match cmd::harvest::run(args, &config, &progress) {
            Ok(code) => code,
            Err(e) => {
                log::error!("Fatal error: {e:#}");
                ExitCode::from(2)
            }
        },
        Command::Config => {
            eprintln!("{}", cmd::show_config::format_table(&config));
            ExitCode::SUCCESS
        }
    }
}
