//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{org_channel, LiveConfig, OutputConfig};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    settings: SettingsInfo,
    rules: Vec<RuleInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    datasources: Vec<DataSourceInfo>,
}

#[derive(Serialize)]
struct SettingsInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    call_timeout_ms: Option<u64>,
    channel_capacity: usize,
    cache_ttl_secs: u64,
}

#[derive(Serialize)]
struct RuleInfo {
    org_id: i64,
    channel: String,
    /// Scoped address publishers use
    address: String,
    converter: String,
    outputs: Vec<String>,
}

#[derive(Serialize)]
struct DataSourceInfo {
    org_id: i64,
    uid: String,
    name: String,
    plugin_id: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let config_info = build_config_info(&config);
    if args.json {
        let json = serde_json::to_string_pretty(&config_info)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config_info);
    }

    Ok(())
}

fn describe_output(rule_channel: &str, output: &OutputConfig) -> String {
    match output {
        OutputConfig::Broadcast { channel: Some(channel) } => format!("broadcast -> {channel}"),
        OutputConfig::Broadcast { channel: None } => format!("broadcast -> stream/{rule_channel}"),
        OutputConfig::Log => "log".to_string(),
    }
}

fn build_config_info(config: &LiveConfig) -> ConfigInfo {
    let rules = config
        .rules
        .iter()
        .map(|rule| RuleInfo {
            org_id: rule.org_id,
            channel: rule.channel.clone(),
            address: org_channel::encode(rule.org_id, &rule.channel)
                .unwrap_or_else(|e| format!("<invalid: {e}>")),
            converter: format!("{:?}", rule.converter),
            outputs: rule
                .outputs
                .iter()
                .map(|o| describe_output(&rule.channel, o))
                .collect(),
        })
        .collect();

    let datasources = config
        .datasources
        .iter()
        .map(|ds| DataSourceInfo {
            org_id: ds.org_id,
            uid: ds.uid.clone(),
            name: ds.name.clone(),
            plugin_id: ds.plugin_id.clone(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        settings: SettingsInfo {
            call_timeout_ms: config.dispatcher.call_timeout_ms,
            channel_capacity: config.hub.channel_capacity,
            cache_ttl_secs: config.context.cache_ttl_secs,
        },
        rules,
        datasources,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Live Publish Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Settings");
    println!("   ├─ Version: {}", info.version);
    match info.settings.call_timeout_ms {
        Some(ms) => println!("   ├─ Call timeout: {}ms", ms),
        None => println!("   ├─ Call timeout: none"),
    }
    println!("   ├─ Hub channel capacity: {}", info.settings.channel_capacity);
    println!("   └─ Context cache TTL: {}s", info.settings.cache_ttl_secs);

    println!("\n🔀 Rules ({})", info.rules.len());
    for (i, rule) in info.rules.iter().enumerate() {
        let is_last = i == info.rules.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({})", prefix, rule.address, rule.converter);
        if rule.outputs.is_empty() {
            println!("   {}  └─ no outputs", child_prefix);
        }
        for (j, output) in rule.outputs.iter().enumerate() {
            let output_prefix = if j == rule.outputs.len() - 1 { "└─" } else { "├─" };
            println!("   {}  {} {}", child_prefix, output_prefix, output);
        }
    }

    if !info.datasources.is_empty() {
        println!("\n🗄️  Datasources ({})", info.datasources.len());
        for (i, ds) in info.datasources.iter().enumerate() {
            let prefix = if i == info.datasources.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} ({}, org {}, plugin {})",
                prefix, ds.name, ds.uid, ds.org_id, ds.plugin_id
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConverterKind, RuleConfig};

    #[test]
    fn test_build_config_info() {
        let config = LiveConfig {
            rules: vec![RuleConfig {
                org_id: 3,
                channel: "sensors/temp".into(),
                converter: ConverterKind::JsonFrame,
                outputs: vec![OutputConfig::Broadcast { channel: None }, OutputConfig::Log],
            }],
            ..Default::default()
        };

        let info = build_config_info(&config);
        assert_eq!(info.rules[0].address, "3/sensors/temp");
        assert_eq!(
            info.rules[0].outputs,
            vec!["broadcast -> stream/sensors/temp".to_string(), "log".to_string()]
        );
        assert!(info.datasources.is_empty());
    }
}
