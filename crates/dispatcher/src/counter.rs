//! SubscriberCounter - local subscriber counts

use std::sync::Arc;

use contracts::BroadcastHub;

/// Reports how many subscribers this node holds for a channel
pub struct SubscriberCounter<H> {
    hub: Arc<H>,
}

impl<H> Clone for SubscriberCounter<H> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<H: BroadcastHub> SubscriberCounter<H> {
    pub fn new(hub: Arc<H>) -> Self {
        Self { hub }
    }

    /// Local subscriber count for `channel`, 0 when unknown
    pub fn count(&self, channel: &str) -> usize {
        self.hub.local_subscriber_count(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::MemoryHub;
    use crate::mock::MockHub;

    #[test]
    fn test_count_passes_through() {
        let hub = Arc::new(MockHub::new().with_subscribers("1/weather", 3));
        let counter = SubscriberCounter::new(hub);

        assert_eq!(counter.count("1/weather"), 3);
        assert_eq!(counter.count("1/unknown"), 0);
    }

    #[test]
    fn test_count_over_memory_hub() {
        let hub = Arc::new(MemoryHub::new(4));
        let counter = SubscriberCounter::new(Arc::clone(&hub));

        let _a = hub.subscribe("stream/cpu").unwrap();
        let _b = hub.subscribe("stream/cpu").unwrap();
        assert_eq!(counter.count("stream/cpu"), 2);
        assert_eq!(counter.clone().count("stream/mem"), 0);
    }

    #[test]
    fn test_count_leaves_no_state_for_unknown_channels() {
        let hub = Arc::new(MemoryHub::new(4));
        let counter = SubscriberCounter::new(Arc::clone(&hub));

        for i in 0..100 {
            assert_eq!(counter.count(&format!("{i}/sensor-{i}")), 0);
        }
        assert!(hub.channels().is_empty());
        assert_eq!(hub.subscriber_total(), 0);
    }
}
