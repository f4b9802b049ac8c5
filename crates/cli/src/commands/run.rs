//! `run` command implementation.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dispatcher::{LiveRuntime, MetricsSnapshot};
use observability::RunningStats;

use super::load_config;
use crate::cli::RunArgs;

/// Statistics from a stdin run
#[derive(Debug, Clone, Default)]
struct RunStats {
    /// Lines that were not `<channel> <payload>`
    malformed_lines: u64,
    duration: Duration,
    dispatch: MetricsSnapshot,
    /// Publish latency in ms
    latency: RunningStats,
}

impl RunStats {
    fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatch.total() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Dispatch Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Publishes: {}", self.dispatch.total());
        println!("   ├─ Rate: {:.2}/s", self.rate());
        println!("   └─ Malformed lines: {}", self.malformed_lines);

        println!("\n📈 Routes");
        println!("   ├─ Pipeline: {}", self.dispatch.pipeline_count);
        println!("   ├─ Broadcast: {}", self.dispatch.broadcast_count);
        println!("   ├─ Failed: {}", self.dispatch.failure_count);
        println!("   └─ Cancelled: {}", self.dispatch.cancelled_count);

        println!("\n⏱️  Latency (ms)");
        println!("   └─ {}", self.latency.summary());

        println!();
    }
}

/// Execute the `run` command
pub async fn run_stdin(args: &RunArgs) -> Result<()> {
    let config = load_config(&args.config, args.call_timeout_ms)?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let runtime = LiveRuntime::from_config(&config).context("Failed to build live runtime")?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, cancelling in-flight publishes...");
        signal_token.cancel();
    });

    info!("Reading `<channel> <payload>` lines from stdin");
    let stats = publish_lines(&runtime, &cancel, args.max_messages).await?;

    runtime.shutdown();
    info!(
        publishes = stats.dispatch.total(),
        failed = stats.dispatch.failure_count,
        duration_secs = stats.duration.as_secs_f64(),
        "Live Publish finished"
    );
    stats.print_summary();
    Ok(())
}

async fn publish_lines(
    runtime: &LiveRuntime,
    cancel: &CancellationToken,
    max_messages: u64,
) -> Result<RunStats> {
    let started = Instant::now();
    let mut stats = RunStats::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = 0u64;

    loop {
        if max_messages > 0 && seen >= max_messages {
            info!(max_messages, "Message limit reached");
            break;
        }

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else {
            debug!("stdin closed");
            break;
        };

        let Some((channel, payload)) = parse_line(&line) else {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                warn!(line = %line, "Expected `<channel> <payload>`");
                stats.malformed_lines += 1;
            }
            continue;
        };
        seen += 1;

        let publish_start = Instant::now();
        match runtime
            .dispatcher
            .publish_local(cancel, channel, Bytes::copy_from_slice(payload.as_bytes()))
            .await
        {
            Ok(route) => {
                let latency_ms = publish_start.elapsed().as_secs_f64() * 1000.0;
                debug!(channel = %channel, route = route.as_str(), latency_ms, "Published");
                stats.latency.push(latency_ms);
            }
            Err(e) => {
                warn!(channel = %channel, retryable = e.is_retryable(), error = %e, "Publish failed");
            }
        }
    }

    stats.duration = started.elapsed();
    stats.dispatch = runtime.dispatcher.metrics().snapshot();
    Ok(stats)
}

/// Split `<channel> <payload>`; blank lines and `#` comments yield None
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (channel, payload) = line.split_once(char::is_whitespace)?;
    Some((channel, payload.trim_start()))
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("1/weather 23C"), Some(("1/weather", "23C")));
        assert_eq!(
            parse_line("1/weather   {\"temp\": 23}"),
            Some(("1/weather", "{\"temp\": 23}"))
        );
        assert_eq!(parse_line("  stream/cpu 0.5"), Some(("stream/cpu", "0.5")));
    }

    #[test]
    fn test_parse_line_skips() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# comment line"), None);
        assert_eq!(parse_line("1/weather"), None);
    }

    #[test]
    fn test_rate_without_duration() {
        let stats = RunStats::default();
        assert_eq!(stats.rate(), 0.0);
    }
}
