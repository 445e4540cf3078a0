//! Harvester main entry point
//!
//! This is the command-line interface for the Harvester file downloader.

use anyhow::Context;
use clap::Parser;
use harvester::config::{load_config_with_hash, prepare_download_folder, Config};
use harvester::crawler::{Orchestrator, RunOptions};
use harvester::history::{load_history, CorruptHistoryPolicy};
use harvester::output::print_summary;
use harvester::{ConfigError, HistoryError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Harvester: download and organize files linked from web pages
///
/// Harvester scans the configured pages for links to files with allowed extensions,
/// downloads the ones it has not seen before and files them under the download folder
/// by date, by type, or both.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(version)]
#[command(about = "Download and organize files linked from web pages", long_about = None)]
struct Cli {
    /// Path to JSON configuration file
    #[arg(short, long, value_name = "PATH", default_value = "config.json")]
    config: PathBuf,

    /// Download files even if they are already in the history
    #[arg(short, long)]
    force_download: bool,

    /// Continue with an empty history if the history file is corrupt (default: abort)
    #[arg(long)]
    reset_corrupt_history: bool,

    /// Validate config and history and show what would be scanned, without downloading
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins when set and no verbosity flag was given.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("harvester=info,warn")),
            1 => EnvFilter::new("harvester=debug,info"),
            2 => EnvFilter::new("harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Maps fatal errors to process exit codes
///
/// 1 = configuration, 2 = history, 3 = anything else.
fn exit_code_for(error: &anyhow::Error) -> u8 {
    if error.downcast_ref::<ConfigError>().is_some() {
        1
    } else if error.downcast_ref::<HistoryError>().is_some() {
        2
    } else {
        3
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("cannot load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let policy = if cli.reset_corrupt_history {
        CorruptHistoryPolicy::StartEmpty
    } else {
        CorruptHistoryPolicy::Abort
    };
    let history = load_history(&config.download_history_file, policy).with_context(|| {
        format!(
            "cannot trust download history {}; fix or remove it, or pass --reset-corrupt-history",
            config.download_history_file.display()
        )
    })?;

    if cli.dry_run {
        handle_dry_run(&config, history.len(), cli.force_download);
        return Ok(());
    }

    prepare_download_folder(&config)?;

    if cli.force_download {
        tracing::info!("Force download enabled: files in the history will be fetched again");
    }

    let options = RunOptions {
        force_download: cli.force_download,
    };
    let mut orchestrator =
        Orchestrator::new(config, history, options).context("cannot start run")?;
    let summary = orchestrator.run().await.context("run aborted")?;

    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Handles the --dry-run mode: shows what a run would do
fn handle_dry_run(config: &Config, history_len: usize, force_download: bool) {
    println!("=== Harvester Dry Run ===\n");

    println!("Targets ({}):", config.target_urls.len());
    for url in &config.target_urls {
        println!("  - {}", url);
    }

    println!("\nDownloads:");
    println!("  Base folder: {}", config.download_base_folder.display());
    println!("  Organization rule: {}", config.organization_rule);
    println!("  Allowed extensions: {}", config.allowed_extensions.join(", "));
    println!("  Request delay: {}s", config.request_delay_seconds);
    println!("  Request timeout: {}s", config.request_timeout_seconds);

    println!("\nHistory:");
    println!("  File: {}", config.download_history_file.display());
    println!("  Entries: {}", history_len);
    if force_download {
        println!("  Force download: history entries would be fetched again");
    }

    println!("\n✓ Configuration is valid");
}
