//! LiveRuntime - production wiring of the publish path

use std::sync::Arc;

use tracing::{info, instrument};

use contracts::{ContractError, LiveConfig};

use crate::context::{CachedContextProvider, ContextGetter};
use crate::counter::SubscriberCounter;
use crate::dispatcher::{DispatcherConfig, PublishDispatcher};
use crate::hub::MemoryHub;
use crate::pipeline::RuleRegistry;

/// Dispatcher type wired to the in-process adapters
pub type LiveDispatcher = PublishDispatcher<RuleRegistry<MemoryHub>, MemoryHub>;

/// Every component of a node, built from one configuration
pub struct LiveRuntime {
    pub hub: Arc<MemoryHub>,
    pub registry: Arc<RuleRegistry<MemoryHub>>,
    pub dispatcher: LiveDispatcher,
    pub subscribers: SubscriberCounter<MemoryHub>,
    pub contexts: ContextGetter<CachedContextProvider>,
}

impl LiveRuntime {
    #[instrument(
        name = "runtime_from_config",
        skip(config),
        fields(rules = config.rules.len(), datasources = config.datasources.len())
    )]
    pub fn from_config(config: &LiveConfig) -> Result<Self, ContractError> {
        let hub = Arc::new(MemoryHub::from_settings(&config.hub));
        let registry = Arc::new(RuleRegistry::from_configs(
            Arc::clone(&hub),
            &config.rules,
        )?);
        let dispatcher = PublishDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&hub),
            DispatcherConfig::from(&config.dispatcher),
        );
        let subscribers = SubscriberCounter::new(Arc::clone(&hub));
        let contexts = ContextGetter::new(Arc::new(CachedContextProvider::from_settings(
            &config.datasources,
            &config.context,
        )));

        info!(
            channel_capacity = config.hub.channel_capacity,
            call_timeout_ms = ?config.dispatcher.call_timeout_ms,
            "Live runtime ready"
        );

        Ok(Self {
            hub,
            registry,
            dispatcher,
            subscribers,
            contexts,
        })
    }

    /// Close the hub; later publishes that reach it fail
    pub fn shutdown(&self) {
        self.hub.close();
    }
}

/// Convenience function to build a runtime from a configuration
pub fn create_runtime(config: &LiveConfig) -> Result<LiveRuntime, ContractError> {
    LiveRuntime::from_config(config)
}
