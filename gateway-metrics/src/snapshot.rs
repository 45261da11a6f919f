use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use gateway_dispatch::{EmailMetrics, TelegramMetrics};
use gateway_dlo::DeadLetterStore;
use gateway_incident::{IncidentEngine, IncidentMetricsSnapshot};
use gateway_queue::DeliveryQueue;
use gateway_worker::{WorkerMetrics, WorkerMetricsSnapshot};
use serde::Serialize;

/// The combined `queue` key of the `/api/metrics` response: the queue's own
/// depth/bound plus the worker pool's counters, flattened into one object
/// the way the original aggregates `queue.metrics` and `worker.metrics`
/// under a single `queue` property.
#[derive(Debug, Clone, Serialize)]
pub struct QueueMetricsSnapshot {
    pub queue_depth: usize,
    pub max_size: usize,
    pub total_enqueued: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_dead_lettered: u64,
    pub active_workers: usize,
    pub running: bool,
}

impl QueueMetricsSnapshot {
    fn new(queue_depth: usize, max_size: usize, total_enqueued: u64, worker: WorkerMetricsSnapshot) -> Self {
        QueueMetricsSnapshot {
            queue_depth,
            max_size,
            total_enqueued,
            total_delivered: worker.total_delivered,
            total_failed: worker.total_failed,
            total_dead_lettered: worker.total_dead_lettered,
            active_workers: worker.active_workers,
            running: worker.running,
        }
    }
}

/// The full shape returned from `GET /api/metrics`: a straight passthrough
/// of each component's own metrics, keyed the way the original's aggregator
/// keys them (`queue`, `telegram`, `email`, `dlo`, `cto_agent`), plus a
/// top-level capture timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub queue: QueueMetricsSnapshot,
    pub telegram: TelegramMetrics,
    pub email: EmailMetrics,
    pub dlo: gateway_dlo::DloMetricsSnapshot,
    pub cto_agent: IncidentMetricsSnapshot,
    pub timestamp: f64,
}

/// Holds the handles needed to assemble a [`MetricsSnapshot`] on demand.
/// Each component already owns its own counters; this type only reads and
/// flattens them; it records nothing itself.
pub struct MetricsAggregator {
    queue: Arc<DeliveryQueue>,
    worker_metrics: Arc<WorkerMetrics>,
    telegram: Arc<dyn Fn() -> TelegramMetrics + Send + Sync>,
    email: Arc<dyn Fn() -> EmailMetrics + Send + Sync>,
    dlo: Arc<DeadLetterStore>,
    incident: Arc<IncidentEngine>,
}

impl MetricsAggregator {
    pub fn new(
        queue: Arc<DeliveryQueue>,
        worker_metrics: Arc<WorkerMetrics>,
        telegram: Arc<dyn Fn() -> TelegramMetrics + Send + Sync>,
        email: Arc<dyn Fn() -> EmailMetrics + Send + Sync>,
        dlo: Arc<DeadLetterStore>,
        incident: Arc<IncidentEngine>,
    ) -> Self {
        MetricsAggregator {
            queue,
            worker_metrics,
            telegram,
            email,
            dlo,
            incident,
        }
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let queue = QueueMetricsSnapshot::new(
            self.queue.depth().await,
            self.queue.max_size(),
            self.queue.total_enqueued(),
            self.worker_metrics.snapshot(),
        );

        MetricsSnapshot {
            queue,
            telegram: (self.telegram)(),
            email: (self.email)(),
            dlo: self.dlo.metrics().await,
            cto_agent: self.incident.metrics().await,
            timestamp: unix_seconds(),
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
    use gateway_dispatch::{EmailDispatcher, TelegramDispatcher};
    use std::time::Duration;

    #[tokio::test]
    async fn snapshot_flattens_every_component() {
        let queue = DeliveryQueue::new(10);
        let worker_metrics = Arc::new(WorkerMetrics::default());
        let telegram = Arc::new(TelegramDispatcher::new(Default::default()));
        let email = Arc::new(EmailDispatcher::new(Default::default()));
        let dlo = Arc::new(DeadLetterStore::new(None, Duration::from_secs(1)));
        let incident = Arc::new(IncidentEngine::new(None, None, Duration::from_secs(300)));

        let telegram_clone = Arc::clone(&telegram);
        let email_clone = Arc::clone(&email);
        let aggregator = MetricsAggregator::new(
            Arc::clone(&queue),
            worker_metrics,
            Arc::new(move || telegram_clone.metrics()),
            Arc::new(move || email_clone.metrics()),
            dlo,
            incident,
        );

        queue
            .enqueue(test_message(), Duration::from_secs(1))
            .await
            .unwrap();

        let snapshot = aggregator.snapshot().await;
        assert_eq!(snapshot.queue.queue_depth, 1);
        assert_eq!(snapshot.queue.max_size, 10);
        assert_eq!(snapshot.queue.total_enqueued, 1);
        assert_eq!(snapshot.telegram.total_sent, 0);
        assert_eq!(snapshot.dlo.current_count, 0);
        assert_eq!(snapshot.cto_agent.active_incidents, 0);
        assert!(snapshot.timestamp > 0.0);
    }

    fn test_message() -> gateway_types::Message {
        gateway_types::Message {
            sms_id: "a".into(),
            sender: "+91".into(),
            body: "otp".into(),
            timestamp: "t".into(),
            node_id: "n".into(),
            status: gateway_types::MessageStatus::Queued,
            retry_count: 0,
            max_retries: 5,
            created_at: 0.0,
            last_error: String::new(),
            priority: gateway_types::Priority::Normal,
        }
    }
}
