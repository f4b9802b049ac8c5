//! Frame outputs

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use contracts::{
    org_channel, BroadcastHub, ChannelFrame, ChannelId, ContractError, OrgId, OutputConfig,
    Publication,
};

/// Where processed frames go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutput {
    /// Publish frames as JSON on a channel of the rule's org
    Broadcast { channel: ChannelId },
    /// Log a frame summary
    Log,
}

impl FrameOutput {
    pub fn from_config(config: &OutputConfig, rule_channel: &ChannelId) -> Self {
        match config {
            OutputConfig::Broadcast { channel: Some(channel) } => FrameOutput::Broadcast {
                channel: ChannelId::from(channel.as_str()),
            },
            OutputConfig::Broadcast { channel: None } => FrameOutput::Broadcast {
                channel: ChannelId::from(format!("stream/{rule_channel}")),
            },
            OutputConfig::Log => FrameOutput::Log,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrameOutput::Broadcast { .. } => "broadcast",
            FrameOutput::Log => "log",
        }
    }

    /// Channel id a frame is published to; a frame's own channel wins
    pub fn target<'a>(&'a self, frame: &'a ChannelFrame) -> Option<&'a str> {
        match self {
            FrameOutput::Broadcast { channel } if frame.channel.is_empty() => Some(channel.as_str()),
            FrameOutput::Broadcast { .. } => Some(frame.channel.as_str()),
            FrameOutput::Log => None,
        }
    }

    pub(crate) async fn apply<H: BroadcastHub + Sync>(
        &self,
        hub: &H,
        cancel: &CancellationToken,
        org_id: OrgId,
        source: &ChannelId,
        frame: &ChannelFrame,
    ) -> Result<(), ContractError> {
        match self.target(frame) {
            Some(target) => {
                let address = org_channel::encode(org_id, target)
                    .map_err(|e| ContractError::output(self.name(), e.to_string()))?;
                let payload = serde_json::to_vec(&frame.frame)
                    .map_err(|e| ContractError::output(self.name(), e.to_string()))?;

                hub.broadcast(cancel, &address, Publication::unpositioned(Bytes::from(payload)))
                    .await
                    .map_err(|e| ContractError::output(self.name(), e.to_string()))?;
                debug!(org_id, source = %source, address = %address, "Frame broadcast");
            }
            None => {
                info!(
                    org_id,
                    channel = %source,
                    frame = %frame.frame.name,
                    fields = frame.frame.fields.len(),
                    "Frame processed"
                );
            }
        }
        Ok(())
    }
}
