use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use gateway_queue::DeliveryQueue;
use gateway_telemetry::TelemetryRegistry;
use gateway_types::RSSI_UNKNOWN;
use tokio::sync::{RwLock, watch};

use crate::config::HealthConfig;
use crate::report::{Accumulator, HealthReport, HealthStatus, NodeSummary, QueueSummary};

/// Capability the health evaluator calls into when a report comes back
/// `Degraded` or `Critical`. The incident engine implements this, but the
/// evaluator never depends on it concretely.
#[async_trait]
pub trait AlertListener: Send + Sync {
    async fn on_alert(&self, alert_type: &str, issues: Vec<String>, report: HealthReport);
}

/// Periodic evaluator over edge-node telemetry and queue depth.
pub struct HealthEvaluator {
    telemetry: Arc<TelemetryRegistry>,
    queue: Arc<DeliveryQueue>,
    queue_max_size: usize,
    config: HealthConfig,
    listener: Option<Arc<dyn AlertListener>>,
    latest: RwLock<Option<HealthReport>>,
}

impl HealthEvaluator {
    pub fn new(
        telemetry: Arc<TelemetryRegistry>,
        queue: Arc<DeliveryQueue>,
        queue_max_size: usize,
        config: HealthConfig,
        listener: Option<Arc<dyn AlertListener>>,
    ) -> Arc<Self> {
        Arc::new(HealthEvaluator {
            telemetry,
            queue,
            queue_max_size,
            config,
            listener,
            latest: RwLock::new(None),
        })
    }

    /// Last computed report, or `Unknown` with no issues before the first
    /// tick has run. Backs `GET /api/health` before the loop warms up.
    pub async fn latest(&self) -> HealthReport {
        self.latest.read().await.clone().unwrap_or_else(|| HealthReport {
            status: HealthStatus::Unknown,
            timestamp: unix_seconds(),
            issues: vec!["No edge nodes registered".to_string()],
            nodes: Vec::new(),
            queue: QueueSummary { depth: 0, max_size: self.queue_max_size, utilization_percent: 0.0 },
        })
    }

    async fn evaluate(&self) -> HealthReport {
        let nodes = self.telemetry.snapshot().await;
        let now = unix_seconds();
        let mut acc = Accumulator::new();
        let mut summaries = Vec::with_capacity(nodes.len());

        for node in &nodes {
            let since_last_seen = now - node.last_seen;
            if since_last_seen > self.config.heartbeat_timeout.as_secs_f64() {
                acc.raise(
                    HealthStatus::Critical,
                    format!(
                        "Node {}: heartbeat timeout ({}s ago)",
                        node.node_id,
                        since_last_seen.round() as i64
                    ),
                );
            } else {
                let battery_percent = node.battery_percent();
                if i64::from(battery_percent) < i64::from(self.config.battery_low_threshold) {
                    acc.raise(
                        HealthStatus::Degraded,
                        format!("Node {}: battery low ({battery_percent}%)", node.node_id),
                    );
                }
            }

            if node.wifi_rssi < self.config.signal_low_threshold && node.wifi_rssi > RSSI_UNKNOWN {
                acc.raise(
                    HealthStatus::Degraded,
                    format!("Node {}: signal weak ({} dBm)", node.node_id, node.wifi_rssi),
                );
            }

            if node.wdt_resets > 5 {
                acc.raise(
                    HealthStatus::Degraded,
                    format!(
                        "Node {}: excessive watchdog resets ({})",
                        node.node_id, node.wdt_resets
                    ),
                );
            }

            summaries.push(NodeSummary {
                node_id: node.node_id.clone(),
                battery_percent: node.battery_percent(),
                rssi: node.wifi_rssi,
                uptime_sec: node.uptime_sec,
                wdt_resets: node.wdt_resets,
                last_seen: node.last_seen,
                seconds_since_last_seen: since_last_seen,
                heap_free: node.heap_free,
            });
        }

        let depth = self.queue.depth().await;
        let utilization = if self.queue_max_size == 0 {
            0.0
        } else {
            depth as f64 / self.queue_max_size as f64
        };
        if utilization > 0.9 {
            acc.raise(
                HealthStatus::Critical,
                format!("Queue near capacity ({depth}/{})", self.queue_max_size),
            );
        } else if utilization > 0.7 {
            acc.raise(
                HealthStatus::Degraded,
                format!("Queue elevated ({depth}/{})", self.queue_max_size),
            );
        }

        let status = if nodes.is_empty() {
            acc.issues.push("No edge nodes registered".to_string());
            HealthStatus::Unknown
        } else {
            acc.status
        };

        HealthReport {
            status,
            timestamp: now,
            issues: acc.issues,
            nodes: summaries,
            queue: QueueSummary {
                depth,
                max_size: self.queue_max_size,
                utilization_percent: (utilization * 1000.0).round() / 10.0,
            },
        }
    }

    /// Runs the tick-driven evaluation loop until `shutdown` reports
    /// `Signal::Shutdown`. A single evaluation failure (there are none
    /// today, but a future telemetry backend could add one) is caught so
    /// the loop survives to the next tick rather than terminating it.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<gateway_common::Signal>) {
        let mut interval = tokio::time::interval(self.config.check_interval);
        interval.tick().await; // first tick fires immediately; consume it up front

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.evaluate().await;
                    *self.latest.write().await = Some(report.clone());

                    if matches!(report.status, HealthStatus::Degraded | HealthStatus::Critical)
                        && let Some(listener) = &self.listener
                    {
                        let alert_type = report.status.as_str().to_string();
                        listener.on_alert(&alert_type, report.issues.clone(), report).await;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() == gateway_common::Signal::Shutdown {
                        break;
                    }
                }
            }
        }
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_telemetry::TelemetryUpdate;

    #[tokio::test]
    async fn unknown_when_no_nodes_registered() {
        let telemetry = TelemetryRegistry::new();
        let queue = DeliveryQueue::new(100);
        let evaluator = HealthEvaluator::new(telemetry, queue, 100, HealthConfig::default(), None);

        let report = evaluator.evaluate().await;
        assert_eq!(report.status, HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn healthy_when_all_nodes_nominal() {
        let telemetry = TelemetryRegistry::new();
        telemetry
            .update(TelemetryUpdate {
                node_id: "n1".into(),
                battery_mv: Some(4000),
                wifi_rssi: Some(-50),
                ..Default::default()
            })
            .await;
        let queue = DeliveryQueue::new(100);
        let evaluator = HealthEvaluator::new(telemetry, queue, 100, HealthConfig::default(), None);

        let report = evaluator.evaluate().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn battery_at_exact_threshold_is_not_low() {
        let telemetry = TelemetryRegistry::new();
        telemetry
            .update(TelemetryUpdate {
                node_id: "n1".into(),
                battery_mv: Some(3240), // exactly 20%
                ..Default::default()
            })
            .await;
        let queue = DeliveryQueue::new(100);
        let evaluator = HealthEvaluator::new(telemetry, queue, 100, HealthConfig::default(), None);

        let report = evaluator.evaluate().await;
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn rssi_sentinel_never_flags_weak_signal() {
        let telemetry = TelemetryRegistry::new();
        telemetry
            .update(TelemetryUpdate {
                node_id: "n1".into(),
                battery_mv: Some(4000),
                wifi_rssi: Some(RSSI_UNKNOWN),
                ..Default::default()
            })
            .await;
        let queue = DeliveryQueue::new(100);
        let evaluator = HealthEvaluator::new(telemetry, queue, 100, HealthConfig::default(), None);

        let report = evaluator.evaluate().await;
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn queue_utilization_exactly_at_boundary_does_not_escalate() {
        let telemetry = TelemetryRegistry::new();
        telemetry
            .update(TelemetryUpdate { node_id: "n1".into(), battery_mv: Some(4000), ..Default::default() })
            .await;
        let queue = DeliveryQueue::new(100);
        for i in 0..70 {
            queue
                .enqueue(
                    gateway_types::Message::from_ingress(
                        format!("id-{i}"),
                        "s".into(),
                        "b".into(),
                        "t".into(),
                        "n".into(),
                        gateway_types::Priority::Normal,
                        5,
                    ),
                    std::time::Duration::from_secs(1),
                )
                .await
                .unwrap();
        }
        let evaluator = HealthEvaluator::new(telemetry, queue, 100, HealthConfig::default(), None);

        let report = evaluator.evaluate().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!((report.queue.utilization_percent - 70.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn queue_over_ninety_percent_is_critical() {
        let telemetry = TelemetryRegistry::new();
        telemetry
            .update(TelemetryUpdate { node_id: "n1".into(), battery_mv: Some(4000), ..Default::default() })
            .await;
        let queue = DeliveryQueue::new(100);
        for i in 0..95 {
            queue
                .enqueue(
                    gateway_types::Message::from_ingress(
                        format!("id-{i}"),
                        "s".into(),
                        "b".into(),
                        "t".into(),
                        "n".into(),
                        gateway_types::Priority::Normal,
                        5,
                    ),
                    std::time::Duration::from_secs(1),
                )
                .await
                .unwrap();
        }
        let evaluator = HealthEvaluator::new(telemetry, queue, 100, HealthConfig::default(), None);

        let report = evaluator.evaluate().await;
        assert_eq!(report.status, HealthStatus::Critical);
    }

    #[tokio::test]
    async fn heartbeat_timeout_is_always_critical() {
        let telemetry = TelemetryRegistry::new();
        telemetry
            .update(TelemetryUpdate { node_id: "n1".into(), battery_mv: Some(4000), ..Default::default() })
            .await;
        let queue = DeliveryQueue::new(100);
        let config = HealthConfig { heartbeat_timeout: std::time::Duration::from_millis(1), ..HealthConfig::default() };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let evaluator = HealthEvaluator::new(telemetry, queue, 100, config, None);

        let report = evaluator.evaluate().await;
        assert_eq!(report.status, HealthStatus::Critical);
        assert!(report.issues.iter().any(|i| i.contains("heartbeat timeout")));
    }
}
