//! PublishDispatcher - routes a local publish to the rule pipeline or the hub

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use contracts::{
    org_channel, BroadcastHub, ChannelId, ConversionOutcome, DispatcherSettings, OrgId,
    PipelineGateway, Publication,
};

use crate::error::{DispatchError, Step};
use crate::metrics::DispatchMetrics;

/// Dispatcher configuration
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Deadline applied to each collaborator call
    pub call_timeout: Option<Duration>,
}

impl From<&DispatcherSettings> for DispatcherConfig {
    fn from(settings: &DispatcherSettings) -> Self {
        Self {
            call_timeout: settings.call_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Delivery strategy used for a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Converted and processed by the channel rule
    Pipeline,
    /// Raw payload broadcast to local subscribers
    Broadcast,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Pipeline => "pipeline",
            Route::Broadcast => "broadcast",
        }
    }
}

/// Routes each publish through exactly one of the rule pipeline or a raw
/// hub broadcast.
///
/// Holds only shared collaborator handles; cloning is cheap and clones may
/// publish concurrently.
pub struct PublishDispatcher<G, H> {
    gateway: Arc<G>,
    hub: Arc<H>,
    config: DispatcherConfig,
    metrics: Arc<DispatchMetrics>,
}

impl<G, H> Clone for PublishDispatcher<G, H> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            hub: Arc::clone(&self.hub),
            config: self.config.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<G, H> PublishDispatcher<G, H>
where
    G: PipelineGateway + Sync,
    H: BroadcastHub + Sync,
{
    pub fn new(gateway: Arc<G>, hub: Arc<H>, config: DispatcherConfig) -> Self {
        Self {
            gateway,
            hub,
            config,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Get dispatch counters
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Publish `data` to `channel` on this node.
    ///
    /// Channels with a conversion rule go through the rule pipeline; all
    /// others get the raw payload broadcast with an unset stream position.
    /// `cancel` is forwarded to, and raced against, every collaborator call.
    ///
    /// # Errors
    /// See [`DispatchError`]. No step is retried and a failure in one
    /// strategy never falls back to the other.
    #[instrument(
        name = "dispatcher_publish_local",
        skip(self, cancel, channel, data),
        fields(channel = %channel, bytes = data.len())
    )]
    pub async fn publish_local(
        &self,
        cancel: &CancellationToken,
        channel: &str,
        data: Bytes,
    ) -> Result<Route, DispatchError> {
        let started = Instant::now();
        let result = self.route(cancel, channel, data).await;
        self.record(&result, started);
        result
    }

    async fn route(
        &self,
        cancel: &CancellationToken,
        channel: &str,
        data: Bytes,
    ) -> Result<Route, DispatchError> {
        let (org_id, channel_id) = org_channel::decode(channel)?;

        let has_rule = self
            .guard(
                cancel,
                channel,
                Step::Lookup,
                self.gateway.rule_exists(cancel, org_id, &channel_id),
            )
            .await?
            .map_err(|source| DispatchError::Gateway {
                channel: channel.to_string(),
                step: Step::Lookup,
                source,
            })?;

        if has_rule {
            self.run_pipeline(cancel, channel, org_id, &channel_id, &data)
                .await?;
            Ok(Route::Pipeline)
        } else {
            self.broadcast_raw(cancel, channel, data).await?;
            Ok(Route::Broadcast)
        }
    }

    async fn run_pipeline(
        &self,
        cancel: &CancellationToken,
        channel: &str,
        org_id: OrgId,
        channel_id: &ChannelId,
        data: &[u8],
    ) -> Result<(), DispatchError> {
        let outcome = self
            .guard(
                cancel,
                channel,
                Step::Convert,
                self.gateway.convert(cancel, org_id, channel_id, data),
            )
            .await?
            .map_err(|source| DispatchError::Gateway {
                channel: channel.to_string(),
                step: Step::Convert,
                source,
            })?;

        // Existence was confirmed above; a missing rule now is surfaced
        // instead of broadcasting the raw payload.
        let frames = match outcome {
            ConversionOutcome::Frames(frames) => frames,
            ConversionOutcome::NoRule => {
                return Err(DispatchError::Conversion {
                    channel: channel_id.clone(),
                })
            }
        };

        debug!(org_id, frames = frames.len(), "Payload converted");
        observability::record_frames_converted(frames.len());

        self.guard(
            cancel,
            channel,
            Step::Process,
            self.gateway.process(cancel, org_id, channel_id, frames),
        )
        .await?
        .map_err(|source| DispatchError::Processing {
            channel: channel.to_string(),
            source,
        })
    }

    async fn broadcast_raw(
        &self,
        cancel: &CancellationToken,
        channel: &str,
        data: Bytes,
    ) -> Result<(), DispatchError> {
        let publication = Publication::unpositioned(data);

        self.guard(
            cancel,
            channel,
            Step::Broadcast,
            self.hub.broadcast(cancel, channel, publication),
        )
        .await?
        .map_err(|source| DispatchError::Broadcast {
            channel: channel.to_string(),
            source,
        })
    }

    /// Race a collaborator call against cancellation and the call deadline
    async fn guard<T>(
        &self,
        cancel: &CancellationToken,
        channel: &str,
        step: Step,
        call: impl Future<Output = T>,
    ) -> Result<T, DispatchError> {
        let cancelled = || DispatchError::Cancelled {
            channel: channel.to_string(),
            step,
        };

        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        match self.config.call_timeout {
            Some(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(cancelled()),
                result = tokio::time::timeout(limit, call) => {
                    result.map_err(|_| DispatchError::Timeout {
                        channel: channel.to_string(),
                        step,
                        timeout_ms: limit.as_millis() as u64,
                    })
                }
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(cancelled()),
                output = call => Ok(output),
            },
        }
    }

    fn record(&self, result: &Result<Route, DispatchError>, started: Instant) {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(route) => {
                match route {
                    Route::Pipeline => self.metrics.inc_pipeline_count(),
                    Route::Broadcast => self.metrics.inc_broadcast_count(),
                }
                observability::record_publish(route.as_str(), "success");
                observability::record_publish_latency_ms(route.as_str(), latency_ms);
                debug!(route = route.as_str(), latency_ms, "Publish delivered");
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                if matches!(
                    e,
                    DispatchError::Cancelled { .. } | DispatchError::Timeout { .. }
                ) {
                    self.metrics.inc_cancelled_count();
                }
                let route = match e.step() {
                    Step::Decode | Step::Lookup => "none",
                    Step::Convert | Step::Process => Route::Pipeline.as_str(),
                    Step::Broadcast => Route::Broadcast.as_str(),
                };
                observability::record_publish(route, e.kind());
                warn!(step = %e.step(), error = %e, "Publish failed");
            }
        }
    }
}
