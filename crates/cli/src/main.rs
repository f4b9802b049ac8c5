//! # Live Publish CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 单条发布与标准输入批量发布
//! - 优雅关闭处理（取消进行中的调用）

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat, LogWriter, ObservabilityConfig};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_publish, run_stdin, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Live Publish CLI starting"
    );

    let result = match &cli.command {
        Commands::Publish(args) => run_publish(args).await,
        Commands::Run(args) => run_stdin(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_with_config(observability_config(cli))
}

/// Map CLI options to the observability setup
///
/// stdout carries command output, so logs go to stderr. Metrics are
/// started per command.
fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let (default_log_level, use_env_filter) = if cli.quiet {
        ("warn", false)
    } else {
        let level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        (level, true)
    };

    ObservabilityConfig {
        log_format: match cli.log_format {
            cli::LogFormat::Json => LogFormat::Json,
            cli::LogFormat::Pretty => LogFormat::Pretty,
            cli::LogFormat::Compact => LogFormat::Compact,
        },
        writer: LogWriter::Stderr,
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
        use_env_filter,
    }
}
