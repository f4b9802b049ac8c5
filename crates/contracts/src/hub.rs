//! BroadcastHub trait - local pub/sub hub interface

use tokio_util::sync::CancellationToken;

use crate::{ContractError, Publication};

/// Local subscriber hub
#[trait_variant::make(BroadcastHub: Send)]
pub trait LocalBroadcastHub {
    /// Deliver a publication to the local subscribers of `channel`
    ///
    /// `channel` is the full channel string, org prefix included.
    async fn broadcast(
        &self,
        cancel: &CancellationToken,
        channel: &str,
        publication: Publication,
    ) -> Result<(), ContractError>;

    /// Number of subscribers of `channel` on this node
    fn local_subscriber_count(&self, channel: &str) -> usize;
}
