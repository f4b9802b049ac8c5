//! # Dispatcher
//!
//! 本地发布分发模块。
//!
//! 负责：
//! - 解析带组织前缀的频道地址
//! - 按规则决定走转换管道还是原样广播（二选一）
//! - 进程内 Hub、规则注册表、插件上下文缓存

pub mod context;
pub mod counter;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod metrics;
pub mod mock;
pub mod pipeline;
pub mod runtime;

pub use contracts::{BroadcastHub, PipelineGateway, Publication};
pub use context::{CachedContextProvider, ContextGetter};
pub use counter::SubscriberCounter;
pub use dispatcher::{DispatcherConfig, PublishDispatcher, Route};
pub use error::{DispatchError, Step};
pub use hub::{MemoryHub, Subscription};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use pipeline::{ChannelRule, FrameOutput, RuleRegistry};
pub use runtime::{create_runtime, LiveDispatcher, LiveRuntime};
