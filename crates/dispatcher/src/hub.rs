//! MemoryHub - in-process broadcast hub
//!
//! One `tokio::sync::broadcast` channel per subscribed channel string.
//! Senders are created on first subscribe and pruned once the last
//! receiver is gone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use contracts::{org_channel, BroadcastHub, ContractError, HubSettings, Publication};

/// Receiving side of a hub subscription
pub type Subscription = broadcast::Receiver<Publication>;

/// In-process hub delivering publications to local subscribers
#[derive(Debug)]
pub struct MemoryHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Publication>>>,
    /// Per-channel buffer; slow receivers lag past this
    capacity: usize,
    closed: AtomicBool,
}

impl MemoryHub {
    /// Create a hub; `capacity` is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_settings(settings: &HubSettings) -> Self {
        Self::new(settings.channel_capacity)
    }

    /// Subscribe to publications on `channel`
    ///
    /// # Errors
    /// `Address` if the channel is malformed, `HubClosed` after [`close`](Self::close).
    #[instrument(name = "hub_subscribe", skip(self, channel), fields(channel = %channel))]
    pub fn subscribe(&self, channel: &str) -> Result<Subscription, ContractError> {
        org_channel::decode(channel)?;
        if self.is_closed() {
            return Err(ContractError::HubClosed);
        }

        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let receiver = match channels.get(channel) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                channels.insert(channel.to_string(), sender);
                receiver
            }
        };

        observability::record_local_subscribers(total_receivers(&channels));
        debug!(capacity = self.capacity, "Subscribed");
        Ok(receiver)
    }

    /// Stop accepting broadcasts and drop every sender
    ///
    /// Existing subscriptions drain what they buffered, then see `Closed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = {
            let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
            let n = channels.len();
            channels.clear();
            n
        };
        observability::record_local_subscribers(0);
        info!(channels = dropped, "MemoryHub closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Channels that currently have a sender, sorted
    pub fn channels(&self) -> Vec<String> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Live receivers across every channel
    pub fn subscriber_total(&self) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        total_receivers(&channels)
    }

    /// Send to the channel's subscribers; returns receivers reached
    fn send(&self, channel: &str, publication: Publication) -> usize {
        let result = {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            match channels.get(channel) {
                Some(sender) => sender.send(publication),
                None => return 0,
            }
        };

        match result {
            Ok(receivers) => receivers,
            Err(_) => {
                // every receiver is gone
                self.prune(channel);
                0
            }
        }
    }

    fn prune(&self, channel: &str) {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        if channels
            .get(channel)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(channel);
            observability::record_local_subscribers(total_receivers(&channels));
            trace!(channel = %channel, "Pruned channel without subscribers");
        }
    }
}

fn total_receivers(channels: &HashMap<String, broadcast::Sender<Publication>>) -> usize {
    channels.values().map(|sender| sender.receiver_count()).sum()
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::from_settings(&HubSettings::default())
    }
}

impl BroadcastHub for MemoryHub {
    #[instrument(
        name = "hub_broadcast",
        skip(self, _cancel, publication),
        fields(channel = %channel, bytes = publication.data.len())
    )]
    async fn broadcast(
        &self,
        _cancel: &CancellationToken,
        channel: &str,
        publication: Publication,
    ) -> Result<(), ContractError> {
        if self.is_closed() {
            return Err(ContractError::HubClosed);
        }
        let receivers = self.send(channel, publication);
        trace!(receivers, "Publication delivered");
        Ok(())
    }

    fn local_subscriber_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}
