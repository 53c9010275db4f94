//! # Finishline CLI
//!
//! Runs either node of the timing system:
//! - `finish`: start-signal listener, finish sensor, leaderboard and console
//! - `start`: start sensor that sends its timestamp to the finish node

mod cli;
mod console;
mod start_node;

use anyhow::{Context, Result};
use clap::Parser;
use finishline::{SensorBackend, TimerConfig};
use tracing::info;
use tracing_subscriber::Layer;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Finishline starting");

    let mut config = load_config(&cli)?;
    if cli.simulate {
        config.sensor.backend = SensorBackend::Simulated;
    }

    let result = match &cli.command {
        Commands::Finish(args) => {
            if let Some(port) = args.port {
                config.signal.port = port;
            }
            if let Some(path) = &args.leaderboard {
                config.storage.path = path.clone();
            }
            console::run(config).await
        }
        Commands::Start(args) => start_node::run(config, args).await,
        Commands::CheckConfig => {
            config.validate()?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

fn load_config(cli: &Cli) -> Result<TimerConfig> {
    if cli.config.exists() {
        TimerConfig::from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))
    } else {
        info!("No configuration at {}, using defaults", cli.config.display());
        Ok(TimerConfig::default())
    }
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        let default_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    // Logs go to stderr so the console table on stdout stays readable
    let fmt_layer = match cli.log_format {
        cli::LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        cli::LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        cli::LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
