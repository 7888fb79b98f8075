//! 生产者指标收集模块
//!
//! 基于 `metrics` facade 记录发布、服务发现、管理操作的运行指标。
//! 未安装 recorder 时所有调用均为空操作。

use contracts::ProducerTransaction;
use metrics::{counter, gauge, histogram};

/// 记录一次入队的发布请求
pub fn record_publish_enqueued(node: &str) {
    counter!(
        "broker_producer_publish_enqueued_total",
        "node" => node.to_string()
    )
    .increment(1);
}

/// 记录一次发布结果
pub fn record_publish(node: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "broker_producer_publish_total",
        "node" => node.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次服务发现的结果
///
/// `nodes` 为发现的节点数，`failures` 为失败的 lookup 数。
pub fn record_discovery(category: &str, nodes: usize, failures: usize) {
    counter!(
        "broker_discovery_runs_total",
        "category" => category.to_string()
    )
    .increment(1);

    gauge!(
        "broker_discovery_nodes",
        "category" => category.to_string()
    )
    .set(nodes as f64);

    if failures > 0 {
        counter!(
            "broker_discovery_lookup_failures_total",
            "category" => category.to_string()
        )
        .increment(failures as u64);
    }
}

/// 记录连接池大小
pub fn record_pool_size(category: &str, size: usize) {
    gauge!(
        "broker_producer_pool_size",
        "category" => category.to_string()
    )
    .set(size as f64);
}

/// 记录一次管理请求 (topic/channel 创建删除)
pub fn record_admin(action: &str, node: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "broker_admin_requests_total",
        "action" => action.to_string(),
        "node" => node.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录发布确认延迟 (毫秒)
pub fn record_publish_latency_ms(latency_ms: f64) {
    histogram!("broker_producer_publish_latency_ms").record(latency_ms);
}

/// 发布结果聚合器
///
/// 在内存中聚合异步发布的结果，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct PublishStatsAggregator {
    /// 成功数
    pub succeeded: u64,

    /// 失败数
    pub failed: u64,

    /// 发布字节数
    pub bytes: u64,

    /// 确认延迟统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 各节点失败次数
    pub node_failures: std::collections::HashMap<String, u64>,
}

impl PublishStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, transaction: &ProducerTransaction, latency_ms: f64) {
        if transaction.is_ok() {
            self.succeeded += 1;
            self.bytes += transaction.body_len as u64;
        } else {
            self.failed += 1;
            *self
                .node_failures
                .entry(transaction.node.clone())
                .or_insert(0) += 1;
        }
        self.latency_stats.push(latency_ms);
        record_publish_latency_ms(latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> PublishSummary {
        let total = self.succeeded + self.failed;
        PublishSummary {
            total,
            succeeded: self.succeeded,
            failed: self.failed,
            bytes: self.bytes,
            failure_rate: if total > 0 {
                self.failed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            node_failures: self.node_failures.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 发布摘要
#[derive(Debug, Clone, Default)]
pub struct PublishSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub bytes: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub node_failures: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for PublishSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Publish Summary ===")?;
        writeln!(f, "Total messages: {}", self.total)?;
        writeln!(f, "Acknowledged: {} ({} bytes)", self.succeeded, self.bytes)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.failed, self.failure_rate
        )?;
        writeln!(f, "Ack latency (ms): {}", self.latency_ms)?;

        if !self.node_failures.is_empty() {
            writeln!(f, "Failures by node:")?;
            for (node, count) in &self.node_failures {
                writeln!(f, "  {}: {}", node, count)?;
            }
        }

        Ok(())
    }
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

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;

    fn transaction(node: &str, ok: bool) -> ProducerTransaction {
        ProducerTransaction {
            topic: "orders".into(),
            node: node.into(),
            body_len: 10,
            delay: None,
            result: if ok {
                Ok(())
            } else {
                Err(ContractError::publish(node, "orders", "E_BAD_TOPIC"))
            },
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_failures_per_node() {
        let mut aggregator = PublishStatsAggregator::new();
        aggregator.update(&transaction("a:4150", true), 1.0);
        aggregator.update(&transaction("a:4150", true), 3.0);
        aggregator.update(&transaction("b:4150", false), 5.0);

        let summary = aggregator.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.bytes, 20);
        assert_eq!(summary.node_failures.get("b:4150"), Some(&1));
        assert!((summary.failure_rate - 100.0 / 3.0).abs() < 1e-9);
        assert!((summary.latency_ms.mean - 3.0).abs() < 1e-10);

        aggregator.reset();
        assert_eq!(aggregator.summary().total, 0);
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_discovery("orders", 2, 1);
        record_pool_size("orders", 4);
        record_admin("topic_create", "a:4151", true);
        record_publish("a:4150", false);
    }
}
