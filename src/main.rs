use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use gator::cli::{Cli, Command};
use gator::datetime::parse_interval;
use gator::{
    Config, Database, FeedRepository, HttpFetcher, IngestContext, PostRepository, Scheduler,
    ShutdownTrigger, SystemClock,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        gator::logging::init_console_only(&config.logging.level);
    }

    let result = match cli.command {
        Command::Agg { interval } => agg(&config, &interval).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("gator: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn agg(config: &Config, interval: &str) -> gator::Result<()> {
    // Reject a bad interval before touching the database
    let interval = parse_interval(interval)?;

    let db = Database::connect(&config.database.url).await?;
    let fetcher = HttpFetcher::new(&config.fetcher)?;

    let ctx = IngestContext::new(
        Arc::new(FeedRepository::new(db.pool())),
        Arc::new(PostRepository::new(db.pool())),
        Arc::new(fetcher),
        Arc::new(SystemClock),
    );
    let scheduler = Scheduler::with_interval(ctx, interval)?;

    let (trigger, shutdown) = ShutdownTrigger::new();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                trigger.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let summary = scheduler.run(shutdown).await;
    info!("Scheduler {} after {} tick(s)", summary.state, summary.ticks);

    db.pool().close().await;
    Ok(())
}
