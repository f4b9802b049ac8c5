//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Live Publish - route payloads to rule pipelines or local subscribers
#[derive(Parser, Debug)]
#[command(
    name = "live-publish",
    author,
    version,
    about = "Local publish dispatch for org-scoped live channels",
    long_about = "Publishes payloads to org-scoped live channels on this node.\n\n\
                  Channels with a conversion rule are converted and sent to the \n\
                  rule outputs; all other channels are broadcast raw to local \n\
                  subscribers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LIVE_PUBLISH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LIVE_PUBLISH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish a single payload
    Publish(PublishArgs),

    /// Publish `<channel> <payload>` lines read from stdin
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `publish` command
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "live.toml", env = "LIVE_PUBLISH_CONFIG")]
    pub config: PathBuf,

    /// Channel address, e.g. `1/weather`
    #[arg(long)]
    pub channel: String,

    /// Payload text
    #[arg(long)]
    pub data: String,

    /// Print what subscribers received within this window in ms (0 = off)
    #[arg(long, default_value = "0")]
    pub watch: u64,

    /// Override the per-call timeout from configuration
    #[arg(long, env = "LIVE_PUBLISH_CALL_TIMEOUT_MS")]
    pub call_timeout_ms: Option<u64>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "live.toml", env = "LIVE_PUBLISH_CONFIG")]
    pub config: PathBuf,

    /// Override the per-call timeout from configuration
    #[arg(long, env = "LIVE_PUBLISH_CALL_TIMEOUT_MS")]
    pub call_timeout_ms: Option<u64>,

    /// Stop after this many lines (0 = until EOF or signal)
    #[arg(long, default_value = "0", env = "LIVE_PUBLISH_MAX_MESSAGES")]
    pub max_messages: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LIVE_PUBLISH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "live.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "live.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
