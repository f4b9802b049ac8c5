//! `publish` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::sync::broadcast::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use contracts::org_channel;
use dispatcher::{FrameOutput, LiveRuntime, Subscription};

use super::load_config;
use crate::cli::PublishArgs;

/// Execute the `publish` command
pub async fn run_publish(args: &PublishArgs) -> Result<()> {
    let config = load_config(&args.config, args.call_timeout_ms)?;
    let runtime = LiveRuntime::from_config(&config).context("Failed to build live runtime")?;

    let mut watched = Vec::new();
    if args.watch > 0 {
        for channel in watch_channels(&runtime, &args.channel) {
            let sub = runtime
                .hub
                .subscribe(&channel)
                .with_context(|| format!("Failed to subscribe to {channel}"))?;
            watched.push((channel, sub));
        }
    }

    let cancel = CancellationToken::new();
    let route = runtime
        .dispatcher
        .publish_local(&cancel, &args.channel, Bytes::from(args.data.clone()))
        .await
        .with_context(|| format!("Failed to publish to {}", args.channel))?;

    info!(channel = %args.channel, route = route.as_str(), "Published");
    println!("✓ Published to {} via {}", args.channel, route.as_str());

    if args.watch > 0 {
        tokio::time::sleep(Duration::from_millis(args.watch)).await;
        print_received(&mut watched);
    }

    Ok(())
}

/// The published channel plus every broadcast output of its rule
fn watch_channels(runtime: &LiveRuntime, channel: &str) -> Vec<String> {
    let mut channels = vec![channel.to_string()];

    let Ok((org_id, channel_id)) = org_channel::decode(channel) else {
        return channels;
    };
    let Some(rule) = runtime.registry.rule(org_id, &channel_id) else {
        return channels;
    };

    for output in &rule.outputs {
        if let FrameOutput::Broadcast { channel: target } = output {
            match org_channel::encode(org_id, target) {
                Ok(address) if !channels.contains(&address) => channels.push(address),
                Ok(_) => {}
                Err(e) => warn!(output = %target, error = %e, "Skipping unwatchable output"),
            }
        }
    }
    channels
}

fn print_received(watched: &mut [(String, Subscription)]) {
    println!("\n📡 Received");
    for (channel, sub) in watched.iter_mut() {
        let mut count = 0usize;
        loop {
            match sub.try_recv() {
                Ok(publication) => {
                    count += 1;
                    println!(
                        "   ├─ {} <- {}",
                        channel,
                        String::from_utf8_lossy(&publication.data)
                    );
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    println!("   ├─ {} (skipped {} lagged)", channel, skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if count == 0 {
            println!("   ├─ {} (nothing)", channel);
        }
    }
    println!("   └─ done\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConverterKind, LiveConfig, OutputConfig, RuleConfig};

    #[test]
    fn test_watch_channels_include_rule_outputs() {
        let config = LiveConfig {
            rules: vec![RuleConfig {
                org_id: 1,
                channel: "weather".into(),
                converter: ConverterKind::JsonAuto,
                outputs: vec![
                    OutputConfig::Broadcast { channel: None },
                    OutputConfig::Log,
                ],
            }],
            ..Default::default()
        };
        let runtime = LiveRuntime::from_config(&config).unwrap();

        assert_eq!(
            watch_channels(&runtime, "1/weather"),
            vec!["1/weather".to_string(), "1/stream/weather".to_string()]
        );
        assert_eq!(
            watch_channels(&runtime, "2/weather"),
            vec!["2/weather".to_string()]
        );
    }
}
