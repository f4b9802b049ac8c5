//! Mock collaborators
//!
//! Recording test doubles for [`PipelineGateway`] and [`BroadcastHub`] with
//! injectable failures and delays. No network, no rule engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use contracts::{
    BroadcastHub, ChannelFrame, ChannelId, ContractError, ConversionOutcome, OrgId,
    PipelineGateway, Publication,
};

/// Call received by [`MockGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    RuleExists { org_id: OrgId, channel: String },
    Convert { org_id: OrgId, channel: String, data: Vec<u8> },
    Process { org_id: OrgId, channel: String, frames: usize },
}

/// Scripted conversion result
#[derive(Debug, Clone)]
pub enum MockConversion {
    Frames(Vec<ChannelFrame>),
    NoRule,
    Fail(String),
}

/// Mock gateway configuration (failure injection)
#[derive(Debug, Clone)]
pub struct MockGatewayConfig {
    /// `rule_exists` answer
    pub rule_exists: bool,
    /// `rule_exists` fails with this message
    pub lookup_error: Option<String>,
    /// `convert` result
    pub conversion: MockConversion,
    /// `process` fails with this message
    pub process_error: Option<String>,
    /// Delay before `rule_exists` answers
    pub lookup_delay: Option<Duration>,
    /// Delay before `convert` answers
    pub convert_delay: Option<Duration>,
    /// Delay before `process` answers
    pub process_delay: Option<Duration>,
}

impl Default for MockGatewayConfig {
    fn default() -> Self {
        Self {
            rule_exists: false,
            lookup_error: None,
            conversion: MockConversion::NoRule,
            process_error: None,
            lookup_delay: None,
            convert_delay: None,
            process_delay: None,
        }
    }
}

/// Recording gateway double
#[derive(Debug, Default)]
pub struct MockGateway {
    config: MockGatewayConfig,
    calls: Mutex<Vec<GatewayCall>>,
}

impl MockGateway {
    pub fn with_config(config: MockGatewayConfig) -> Self {
        Self {
            config,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// No rule registered for any channel
    pub fn without_rule() -> Self {
        Self::default()
    }

    /// Rule registered, conversion yields `frames`
    pub fn with_rule(frames: Vec<ChannelFrame>) -> Self {
        Self::with_config(MockGatewayConfig {
            rule_exists: true,
            conversion: MockConversion::Frames(frames),
            ..Default::default()
        })
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn convert_calls(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::Convert { .. }))
    }

    pub fn process_calls(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::Process { .. }))
    }

    fn count(&self, pred: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PipelineGateway for MockGateway {
    async fn rule_exists(
        &self,
        _cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
    ) -> Result<bool, ContractError> {
        self.record(GatewayCall::RuleExists {
            org_id,
            channel: channel.to_string(),
        });
        if let Some(delay) = self.config.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.config.lookup_error {
            Some(message) => Err(ContractError::rule_lookup(org_id, channel.as_str(), message)),
            None => Ok(self.config.rule_exists),
        }
    }

    async fn convert(
        &self,
        _cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
        data: &[u8],
    ) -> Result<ConversionOutcome, ContractError> {
        self.record(GatewayCall::Convert {
            org_id,
            channel: channel.to_string(),
            data: data.to_vec(),
        });
        if let Some(delay) = self.config.convert_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.config.conversion {
            MockConversion::Frames(frames) => Ok(ConversionOutcome::Frames(frames.clone())),
            MockConversion::NoRule => Ok(ConversionOutcome::NoRule),
            MockConversion::Fail(message) => Err(ContractError::conversion(channel.as_str(), message)),
        }
    }

    async fn process(
        &self,
        _cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
        frames: Vec<ChannelFrame>,
    ) -> Result<(), ContractError> {
        self.record(GatewayCall::Process {
            org_id,
            channel: channel.to_string(),
            frames: frames.len(),
        });
        if let Some(delay) = self.config.process_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.config.process_error {
            Some(message) => Err(ContractError::output("mock", message)),
            None => Ok(()),
        }
    }
}

/// Recording hub double
#[derive(Debug, Default)]
pub struct MockHub {
    /// Every broadcast fails with this message
    fail: Option<String>,
    /// Fixed subscriber counts per channel
    subscribers: HashMap<String, usize>,
    /// Delay before each broadcast answers
    delay: Option<Duration>,
    attempts: AtomicUsize,
    published: Mutex<Vec<(String, Publication)>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub whose broadcasts always fail
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail: Some(message.into()),
            ..Default::default()
        }
    }

    /// Set the subscriber count reported for `channel`
    pub fn with_subscribers(mut self, channel: impl Into<String>, count: usize) -> Self {
        self.subscribers.insert(channel.into(), count);
        self
    }

    /// Hold every broadcast for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Successful broadcasts, in order
    pub fn published(&self) -> Vec<(String, Publication)> {
        self.published.lock().unwrap().clone()
    }

    /// Broadcast attempts, failed ones included
    pub fn broadcast_calls(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl BroadcastHub for MockHub {
    async fn broadcast(
        &self,
        _cancel: &CancellationToken,
        channel: &str,
        publication: Publication,
    ) -> Result<(), ContractError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail {
            return Err(ContractError::hub_delivery(channel, message));
        }
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), publication));
        Ok(())
    }

    fn local_subscriber_count(&self, channel: &str) -> usize {
        self.subscribers.get(channel).copied().unwrap_or(0)
    }
}
