//! RuleRegistry - in-memory pipeline gateway

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use contracts::{
    org_channel, BroadcastHub, ChannelFrame, ChannelId, ContractError, ConversionOutcome,
    ConverterKind, OrgId, PipelineGateway, RuleConfig,
};

use super::converter;
use super::output::FrameOutput;

/// Conversion rule bound to one channel of one org
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRule {
    pub org_id: OrgId,
    pub channel: ChannelId,
    pub converter: ConverterKind,
    pub outputs: Vec<FrameOutput>,
}

impl ChannelRule {
    /// Build a rule, checking that `(org_id, channel)` forms a valid address
    pub fn from_config(config: &RuleConfig) -> Result<Self, ContractError> {
        org_channel::encode(config.org_id, &config.channel)?;

        let channel = ChannelId::from(config.channel.as_str());
        let outputs = config
            .outputs
            .iter()
            .map(|output| FrameOutput::from_config(output, &channel))
            .collect();

        Ok(Self {
            org_id: config.org_id,
            channel,
            converter: config.converter,
            outputs,
        })
    }
}

/// Rules keyed by org then channel id
///
/// Lookups clone the rule `Arc` and release the lock before any await.
pub struct RuleRegistry<H> {
    rules: RwLock<HashMap<OrgId, HashMap<ChannelId, Arc<ChannelRule>>>>,
    hub: Arc<H>,
}

impl<H> RuleRegistry<H> {
    pub fn new(hub: Arc<H>) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            hub,
        }
    }

    /// Build a registry holding every configured rule
    pub fn from_configs(hub: Arc<H>, configs: &[RuleConfig]) -> Result<Self, ContractError> {
        let registry = Self::new(hub);
        for config in configs {
            registry.register(ChannelRule::from_config(config)?);
        }
        info!(rules = registry.len(), "Rule registry loaded");
        Ok(registry)
    }

    /// Insert or replace a rule; returns the replaced one
    pub fn register(&self, rule: ChannelRule) -> Option<Arc<ChannelRule>> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        rules
            .entry(rule.org_id)
            .or_default()
            .insert(rule.channel.clone(), Arc::new(rule))
    }

    /// Remove a rule; returns whether it existed
    pub fn remove(&self, org_id: OrgId, channel: &ChannelId) -> bool {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let Some(by_channel) = rules.get_mut(&org_id) else {
            return false;
        };
        let removed = by_channel.remove(channel).is_some();
        if by_channel.is_empty() {
            rules.remove(&org_id);
        }
        removed
    }

    pub fn rule(&self, org_id: OrgId, channel: &ChannelId) -> Option<Arc<ChannelRule>> {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        rules.get(&org_id)?.get(channel).cloned()
    }

    /// All rules ordered by org then channel
    pub fn rules(&self) -> Vec<Arc<ChannelRule>> {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<Arc<ChannelRule>> = rules
            .values()
            .flat_map(|by_channel| by_channel.values().cloned())
            .collect();
        all.sort_by(|a, b| (a.org_id, a.channel.as_str()).cmp(&(b.org_id, b.channel.as_str())));
        all
    }

    pub fn len(&self) -> usize {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        rules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: BroadcastHub + Sync> PipelineGateway for RuleRegistry<H> {
    async fn rule_exists(
        &self,
        _cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
    ) -> Result<bool, ContractError> {
        Ok(self.rule(org_id, channel).is_some())
    }

    #[instrument(
        name = "registry_convert",
        skip(self, _cancel, channel, data),
        fields(channel = %channel, bytes = data.len())
    )]
    async fn convert(
        &self,
        _cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
        data: &[u8],
    ) -> Result<ConversionOutcome, ContractError> {
        let Some(rule) = self.rule(org_id, channel) else {
            return Ok(ConversionOutcome::NoRule);
        };
        let frames = converter::convert(rule.converter, channel, data)?;
        debug!(converter = ?rule.converter, frames = frames.len(), "Converted");
        Ok(ConversionOutcome::Frames(frames))
    }

    #[instrument(
        name = "registry_process",
        skip(self, cancel, channel, frames),
        fields(channel = %channel, frames = frames.len())
    )]
    async fn process(
        &self,
        cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
        frames: Vec<ChannelFrame>,
    ) -> Result<(), ContractError> {
        let rule = self.rule(org_id, channel).ok_or_else(|| {
            ContractError::rule_lookup(org_id, channel.as_str(), "rule removed before processing")
        })?;

        for output in &rule.outputs {
            for frame in &frames {
                output
                    .apply(self.hub.as_ref(), cancel, org_id, channel, frame)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHub;
    use contracts::{Frame, OutputConfig};

    fn rule_config(org_id: OrgId, channel: &str, outputs: Vec<OutputConfig>) -> RuleConfig {
        RuleConfig {
            org_id,
            channel: channel.to_string(),
            converter: ConverterKind::JsonAuto,
            outputs,
        }
    }

    fn registry(configs: &[RuleConfig]) -> (RuleRegistry<MockHub>, Arc<MockHub>) {
        let hub = Arc::new(MockHub::new());
        let registry = RuleRegistry::from_configs(Arc::clone(&hub), configs).unwrap();
        (registry, hub)
    }

    #[tokio::test]
    async fn test_rule_exists_is_org_scoped() {
        let (registry, _) = registry(&[rule_config(1, "weather", vec![])]);
        let cancel = CancellationToken::new();
        let weather = ChannelId::from("weather");

        assert!(registry.rule_exists(&cancel, 1, &weather).await.unwrap());
        assert!(!registry.rule_exists(&cancel, 2, &weather).await.unwrap());
        assert!(!registry
            .rule_exists(&cancel, 1, &ChannelId::from("traffic"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_convert_without_rule() {
        let (registry, _) = registry(&[]);
        let cancel = CancellationToken::new();

        let outcome = registry
            .convert(&cancel, 1, &ChannelId::from("weather"), b"{}")
            .await
            .unwrap();
        assert_eq!(outcome, ConversionOutcome::NoRule);
    }

    #[tokio::test]
    async fn test_process_fans_out_to_outputs() {
        let (registry, hub) = registry(&[rule_config(
            1,
            "weather",
            vec![
                OutputConfig::Broadcast { channel: None },
                OutputConfig::Broadcast {
                    channel: Some("alerts/weather".into()),
                },
                OutputConfig::Log,
            ],
        )]);
        let cancel = CancellationToken::new();
        let weather = ChannelId::from("weather");

        let ConversionOutcome::Frames(frames) = registry
            .convert(&cancel, 1, &weather, br#"{"temp": 23}"#)
            .await
            .unwrap()
        else {
            panic!("expected frames");
        };
        registry.process(&cancel, 1, &weather, frames).await.unwrap();

        let targets: Vec<String> = hub.published().into_iter().map(|(ch, _)| ch).collect();
        assert_eq!(targets, vec!["1/stream/weather", "1/alerts/weather"]);
    }

    #[tokio::test]
    async fn test_json_frame_target_overrides_output_channel() {
        let (registry, hub) = registry(&[RuleConfig {
            converter: ConverterKind::JsonFrame,
            ..rule_config(1, "weather", vec![OutputConfig::Broadcast { channel: None }])
        }]);
        let cancel = CancellationToken::new();
        let weather = ChannelId::from("weather");

        for payload in [
            &br#"{"channel": "alerts/storm", "name": "storm"}"#[..],
            &br#"{"name": "forecast"}"#[..],
        ] {
            let ConversionOutcome::Frames(frames) =
                registry.convert(&cancel, 1, &weather, payload).await.unwrap()
            else {
                panic!("expected frames");
            };
            registry.process(&cancel, 1, &weather, frames).await.unwrap();
        }

        let targets: Vec<String> = hub.published().into_iter().map(|(ch, _)| ch).collect();
        assert_eq!(targets, vec!["1/alerts/storm", "1/stream/weather"]);
    }

    #[tokio::test]
    async fn test_process_without_outputs_succeeds() {
        let (registry, hub) = registry(&[rule_config(1, "weather", vec![])]);
        let cancel = CancellationToken::new();
        let frames = vec![ChannelFrame {
            channel: String::new(),
            frame: Frame::new("weather"),
        }];

        registry
            .process(&cancel, 1, &ChannelId::from("weather"), frames)
            .await
            .unwrap();
        assert_eq!(hub.broadcast_calls(), 0);
    }

    #[tokio::test]
    async fn test_process_after_remove_fails() {
        let (registry, _) = registry(&[rule_config(1, "weather", vec![])]);
        let cancel = CancellationToken::new();
        let weather = ChannelId::from("weather");

        assert!(registry.remove(1, &weather));
        assert!(!registry.remove(1, &weather));
        assert!(registry.is_empty());

        let err = registry
            .process(&cancel, 1, &weather, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::RuleLookup { .. }));
    }

    #[test]
    fn test_register_replaces_and_orders() {
        let (registry, _) = registry(&[
            rule_config(2, "weather", vec![]),
            rule_config(1, "traffic", vec![]),
            rule_config(1, "air", vec![]),
        ]);
        assert_eq!(registry.len(), 3);

        let rule = ChannelRule::from_config(&rule_config(1, "air", vec![OutputConfig::Log])).unwrap();
        let replaced = registry.register(rule);
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 3);

        let order: Vec<(OrgId, String)> = registry
            .rules()
            .iter()
            .map(|r| (r.org_id, r.channel.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, "air".to_string()),
                (1, "traffic".to_string()),
                (2, "weather".to_string())
            ]
        );
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let err = ChannelRule::from_config(&rule_config(1, "bad:channel", vec![])).unwrap_err();
        assert!(matches!(err, ContractError::Address(_)));
    }
}
