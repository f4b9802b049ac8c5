//! 配置校验模块
//!
//! 校验规则：
//! - hub channel_capacity > 0
//! - call_timeout_ms > 0 (如配置)
//! - rule: org_id > 0, channel 为合法的 channel id, (org_id, channel) 唯一
//! - broadcast output 目标 channel 合法
//! - datasource: (org_id, uid) 唯一, plugin_id 非空

use std::collections::HashSet;

use contracts::{org_channel, ContractError, LiveConfig, OutputConfig};

/// 校验 LiveConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &LiveConfig) -> Result<(), ContractError> {
    validate_settings(config)?;
    validate_rules(config)?;
    validate_outputs(config)?;
    validate_datasources(config)?;
    Ok(())
}

fn validate_settings(config: &LiveConfig) -> Result<(), ContractError> {
    if config.hub.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "hub.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }

    if config.dispatcher.call_timeout_ms == Some(0) {
        return Err(ContractError::config_validation(
            "dispatcher.call_timeout_ms",
            "call_timeout_ms must be > 0 when set",
        ));
    }

    Ok(())
}

/// 校验 rule 的 org/channel 及唯一性
fn validate_rules(config: &LiveConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, rule) in config.rules.iter().enumerate() {
        if rule.org_id <= 0 {
            return Err(ContractError::config_validation(
                format!("rules[{idx}].org_id"),
                format!("org_id must be > 0, got {}", rule.org_id),
            ));
        }

        if let Err(e) = org_channel::check_path(&rule.channel) {
            return Err(ContractError::config_validation(
                format!("rules[{idx}].channel"),
                e.to_string(),
            ));
        }

        if !seen.insert((rule.org_id, rule.channel.as_str())) {
            return Err(ContractError::config_validation(
                format!("rules[{idx}]"),
                format!(
                    "duplicate rule for org {} channel '{}'",
                    rule.org_id, rule.channel
                ),
            ));
        }
    }
    Ok(())
}

/// 校验 broadcast output 的目标 channel
fn validate_outputs(config: &LiveConfig) -> Result<(), ContractError> {
    for (idx, rule) in config.rules.iter().enumerate() {
        for (out_idx, output) in rule.outputs.iter().enumerate() {
            let OutputConfig::Broadcast {
                channel: Some(target),
            } = output
            else {
                continue;
            };

            if let Err(e) = org_channel::check_path(target) {
                return Err(ContractError::config_validation(
                    format!("rules[{idx}].outputs[{out_idx}].channel"),
                    e.to_string(),
                ));
            }

            if target == &rule.channel {
                return Err(ContractError::config_validation(
                    format!("rules[{idx}].outputs[{out_idx}].channel"),
                    "output channel must differ from the rule channel",
                ));
            }
        }
    }
    Ok(())
}

fn validate_datasources(config: &LiveConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, ds) in config.datasources.iter().enumerate() {
        if ds.uid.is_empty() {
            return Err(ContractError::config_validation(
                format!("datasources[{idx}].uid"),
                "uid cannot be empty",
            ));
        }

        if ds.plugin_id.is_empty() {
            return Err(ContractError::config_validation(
                format!("datasources[{idx}].plugin_id"),
                "plugin_id cannot be empty",
            ));
        }

        if !seen.insert((ds.org_id, ds.uid.as_str())) {
            return Err(ContractError::config_validation(
                format!("datasources[uid={}]", ds.uid),
                format!("duplicate datasource uid in org {}", ds.org_id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConverterKind, DataSourceConfig, RuleConfig};

    fn minimal_config() -> LiveConfig {
        LiveConfig {
            rules: vec![RuleConfig {
                org_id: 1,
                channel: "weather".into(),
                converter: ConverterKind::JsonAuto,
                outputs: vec![OutputConfig::Broadcast {
                    channel: Some("stream/weather".into()),
                }],
            }],
            datasources: vec![DataSourceConfig {
                org_id: 1,
                uid: "ds-1".into(),
                name: "TestData".into(),
                plugin_id: "testdata".into(),
                url: String::new(),
                json_data: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zero_capacity() {
        let mut config = minimal_config();
        config.hub.channel_capacity = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("channel_capacity"), "got: {err}");
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = minimal_config();
        config.dispatcher.call_timeout_ms = Some(0);
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("call_timeout_ms"), "got: {err}");
    }

    #[test]
    fn test_rule_without_org() {
        let mut config = minimal_config();
        config.rules[0].org_id = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("org_id must be > 0"), "got: {err}");
    }

    #[test]
    fn test_rule_with_invalid_channel() {
        let mut config = minimal_config();
        config.rules[0].channel = "weather//today".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("rules[0].channel"), "got: {err}");
    }

    #[test]
    fn test_rule_channel_may_start_with_digits() {
        let mut config = minimal_config();
        config.rules[0].channel = "2024/load".into();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_rule() {
        let mut config = minimal_config();
        config.rules.push(config.rules[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate rule"), "got: {err}");
    }

    #[test]
    fn test_same_channel_in_other_org_is_allowed() {
        let mut config = minimal_config();
        let mut other = config.rules[0].clone();
        other.org_id = 2;
        config.rules.push(other);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_output_loops_back_to_rule_channel() {
        let mut config = minimal_config();
        config.rules[0].outputs = vec![OutputConfig::Broadcast {
            channel: Some("weather".into()),
        }];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("must differ"), "got: {err}");
    }

    #[test]
    fn test_invalid_output_channel() {
        let mut config = minimal_config();
        config.rules[0].outputs = vec![OutputConfig::Broadcast {
            channel: Some("stream:weather".into()),
        }];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("outputs[0].channel"), "got: {err}");
    }

    #[test]
    fn test_duplicate_datasource() {
        let mut config = minimal_config();
        config.datasources.push(config.datasources[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate datasource"), "got: {err}");
    }

    #[test]
    fn test_empty_plugin_id() {
        let mut config = minimal_config();
        config.datasources[0].plugin_id = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
