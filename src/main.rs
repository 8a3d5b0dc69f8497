//! Subsweep - batch subtitle generation
//!
//! Entry point: parses arguments, sets up logging and configuration, checks
//! the external tools, then runs the batch and prints its summary.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subsweep::cli::Args;
use subsweep::config::Config;
use subsweep::discovery::MediaDiscovery;
use subsweep::media::MediaProcessorFactory;
use subsweep::render::RenderCoordinator;
use subsweep::transcribe::TranscriberFactory;
use subsweep::workflow::{BatchDriver, DriverOptions};

const DEFAULT_CONFIG_FILE: &str = "subsweep.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting Subsweep");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    if let Some(language) = &args.language {
        config.transcriber.language = language.clone();
    }

    let discovery = MediaDiscovery::new(&args.root)?;

    let media = MediaProcessorFactory::create_processor(config.media.clone());
    media.check_availability().await?;
    let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone(), media.clone());
    transcriber.check_availability().await?;

    let coordinator = RenderCoordinator::new(media, config.media.burn_suffix.clone())
        .with_encode_timeout(config.workflow.encode_timeout());
    let options = DriverOptions {
        model: args.model.clone().unwrap_or_else(|| config.workflow.default_model.clone()),
        burn_in: args.burn_in(),
        skip_existing: args.skip_existing || config.workflow.skip_existing,
        transcribe_timeout: config.workflow.transcribe_timeout(),
        max_retries: config.workflow.max_retries,
        progress: std::io::stderr().is_terminal(),
    };
    info!(
        "Model: {}, burn-in: {}, skip existing: {}",
        options.model, options.burn_in, options.skip_existing
    );
    let driver = BatchDriver::new(transcriber, coordinator, options);

    let summary = tokio::select! {
        summary = driver.run(&discovery) => summary,
        _ = tokio::signal::ctrl_c() => {
            error!("Interrupted; stopping batch");
            std::process::exit(130);
        }
    };

    print!("{}", summary.render());
    if let Some(report_path) = &args.report {
        summary.write_json(report_path).await?;
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subsweep").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "subsweep.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subsweep.log").display()
    );

    Ok(())
}
