//! 发布链路指标
//!
//! 基于 `metrics` facade 记录分发结果、延迟和订阅者数量。

use metrics::{counter, gauge, histogram};

/// 记录一次发布的结果
///
/// `route` 为 `pipeline` / `broadcast` / `none` (在路由决定前失败)，
/// `status` 为 `success` 或错误类别。
pub fn record_publish(route: &'static str, status: &'static str) {
    counter!(
        "live_publish_total",
        "route" => route,
        "status" => status
    )
    .increment(1);
}

/// 记录发布延迟 (从解码到投递完成)
pub fn record_publish_latency_ms(route: &'static str, latency_ms: f64) {
    histogram!("live_publish_latency_ms", "route" => route).record(latency_ms);
}

/// 记录 pipeline 产出的帧数
pub fn record_frames_converted(count: usize) {
    histogram!("live_pipeline_frames_per_publish").record(count as f64);
}

/// 记录本节点的订阅者总数
///
/// 不按频道打标签：频道名来自客户端，逐频道的序列会无限增长。
pub fn record_local_subscribers(total: usize) {
    gauge!("live_hub_local_subscribers").set(total as f64);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
