//! Listing monitor CLI
//!
//! Local execution entry point for the poll loop and state maintenance.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use listing_monitor::{
    config,
    error::{AppError, Result},
    models::Config,
    pipeline::{Change, ChangeKind, Monitor},
    services::{FeedClient, MessageFormatter, SnapshotSource, TelegramNotifier},
    storage::{FieldChanges, StateStore},
};

/// listing-monitor - HKEX new listing alerts
#[derive(Parser, Debug)]
#[command(
    name = "listing-monitor",
    version,
    about = "Announces new HKEX listing applications on Telegram"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the feed forever
    Run {
        /// Announce everything on an empty state instead of seeding silently
        #[arg(long)]
        notify_existing: bool,
    },

    /// Run a single cycle and exit
    Once,

    /// Validate configuration
    Validate,

    /// Show state file summary
    Info {
        /// Number of most recent records to list
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Remove a listing id from the state file
    Forget {
        /// Listing id
        id: u64,
    },

    /// Print alerts for the current snapshot without sending them
    Preview {
        /// Number of listings to render
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn build_monitor(config: &Config, store: StateStore) -> Result<Monitor> {
    let source = FeedClient::new(&config.feed)?;
    let notifier = TelegramNotifier::new(&config.telegram, &config.feed)?;
    Ok(Monitor::new(
        Box::new(source),
        Box::new(notifier),
        store,
        config,
    ))
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Run { notify_existing } => {
            config.validate()?;
            let store = StateStore::load(&config.state.path).await;
            let mut monitor = build_monitor(&config, store)?;
            if notify_existing {
                monitor = monitor.with_seeding(false);
            }
            monitor.run_until(shutdown_signal()).await;
            log::info!(
                "Monitor stopped. {} listings known in {}",
                monitor.store().len(),
                monitor.store().path().display()
            );
        }

        Command::Once => {
            config.validate()?;
            let store = StateStore::load(&config.state.path).await;
            let mut monitor = build_monitor(&config, store)?;
            let report = monitor.run_cycle().await;
            if report.fetch_failed {
                return Err(AppError::fetch("snapshot unavailable, nothing processed"));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (feed: {})", config.feed.url);
            log::info!("State file: {}", config.state.path.display());
        }

        Command::Info { limit } => {
            let store = StateStore::load(&config.state.path).await;
            println!("State file: {}", store.path().display());
            println!("Known listings: {}", store.len());

            let mut records: Vec<_> = store.iter().collect();
            records.sort_by(|a, b| b.1.first_seen.cmp(&a.1.first_seen).then(b.0.cmp(&a.0)));
            for (id, record) in records.into_iter().take(limit) {
                println!(
                    "  {:>8}  {}  {}  {}",
                    id,
                    record.first_seen.format("%Y-%m-%d %H:%M"),
                    record
                        .status
                        .as_ref()
                        .map(|s| s.label().to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    record.company_name
                );
            }
        }

        Command::Forget { id } => {
            let mut store = StateStore::load(&config.state.path).await;
            match store.forget(id) {
                Some(record) => {
                    store.persist().await?;
                    log::info!(
                        "Forgot listing {} ({}). It will be announced again when next seen",
                        id,
                        record.company_name
                    );
                }
                None => log::warn!("Listing {} is not in {}", id, store.path().display()),
            }
        }

        Command::Preview { limit } => {
            let feed = FeedClient::new(&config.feed)?;
            let formatter = MessageFormatter::new(&config.feed)?;
            let snapshot = feed.fetch().await?;
            for listing in snapshot.listings.into_iter().take(limit) {
                let change = Change {
                    listing,
                    kind: ChangeKind::New,
                    fields: FieldChanges::default(),
                };
                println!("{}\n", formatter.render(&change));
            }
        }
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = config::load_config(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = match loaded {
        Ok(config) => {
            if cli.config.exists() {
                log::debug!("Loaded configuration from {}", cli.config.display());
            } else {
                log::warn!(
                    "Config file {} not found, using defaults and environment",
                    cli.config.display()
                );
            }
            config
        }
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
