//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Finishline - start/finish race timing with a live leaderboard
#[derive(Parser, Debug)]
#[command(name = "finishline", author, version, about = "Two-node race timing")]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FINISHLINE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact", global = true, env = "FINISHLINE_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Path to the YAML configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "finishline.yaml", global = true, env = "FINISHLINE_CONFIG")]
    pub config: PathBuf,

    /// Use the simulated sensor instead of GPIO
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the finish node with an interactive console
    Finish(FinishArgs),

    /// Run the start node: send a timestamp to the finish node on every trigger
    Start(StartArgs),

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[derive(Parser, Debug)]
pub struct FinishArgs {
    /// Override the start signal port
    #[arg(long, env = "FINISHLINE_PORT")]
    pub port: Option<u16>,

    /// Override the leaderboard file
    #[arg(long, env = "FINISHLINE_LEADERBOARD")]
    pub leaderboard: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct StartArgs {
    /// Finish node address, e.g. 192.168.1.20:5000
    #[arg(long, env = "FINISHLINE_TARGET")]
    pub target: SocketAddr,

    /// Exit after sending one timestamp
    #[arg(long)]
    pub once: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable multi-line format
    Pretty,
    /// Single-line format
    #[default]
    Compact,
}
