//! PipelineGateway trait - rule registry interface
//!
//! Lookup, conversion and processing contracts consumed by the dispatcher.

use tokio_util::sync::CancellationToken;

use crate::{ChannelFrame, ChannelId, ContractError, ConversionOutcome, OrgId};

/// Channel rule registry
///
/// `rule_exists` and `convert` are separate contracts and may disagree
/// (a rule removed between the two calls).
#[trait_variant::make(PipelineGateway: Send)]
pub trait LocalPipelineGateway {
    /// Whether a conversion rule is registered for the channel
    ///
    /// # Errors
    /// Lookup failure. Distinct from "no rule".
    async fn rule_exists(
        &self,
        cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
    ) -> Result<bool, ContractError>;

    /// Convert a raw payload into channel frames
    ///
    /// # Errors
    /// The rule exists but the payload could not be converted.
    async fn convert(
        &self,
        cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
        data: &[u8],
    ) -> Result<ConversionOutcome, ContractError>;

    /// Run converted frames through the channel's outputs
    async fn process(
        &self,
        cancel: &CancellationToken,
        org_id: OrgId,
        channel: &ChannelId,
        frames: Vec<ChannelFrame>,
    ) -> Result<(), ContractError>;
}
