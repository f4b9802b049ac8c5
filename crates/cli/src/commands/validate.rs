//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::LiveConfig;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    rule_count: usize,
    datasource_count: usize,
    channel_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_timeout_ms: Option<u64>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    rule_count: config.rules.len(),
                    datasource_count: config.datasources.len(),
                    channel_capacity: config.hub.channel_capacity,
                    call_timeout_ms: config.dispatcher.call_timeout_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &LiveConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.rules.is_empty() {
        warnings.push("No rules configured - every publish is broadcast raw".to_string());
    }

    for rule in &config.rules {
        if rule.outputs.is_empty() {
            warnings.push(format!(
                "Rule '{}/{}' has no outputs - converted frames are discarded",
                rule.org_id, rule.channel
            ));
        }
    }

    if config.dispatcher.call_timeout_ms.is_none() {
        warnings.push("dispatcher.call_timeout_ms is not set - calls only end on cancellation".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Rules: {}", summary.rule_count);
            println!("  Datasources: {}", summary.datasource_count);
            println!("  Hub channel capacity: {}", summary.channel_capacity);
            match summary.call_timeout_ms {
                Some(ms) => println!("  Call timeout: {}ms", ms),
                None => println!("  Call timeout: none"),
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
