use std::sync::Arc;
use std::time::Duration;

use gateway_dispatch::{EmailDispatcher, TelegramDispatcher};
use gateway_dlo::DeadLetterStore;
use gateway_health::HealthEvaluator;
use gateway_incident::IncidentEngine;
use gateway_metrics::MetricsAggregator;
use gateway_queue::DeliveryQueue;
use gateway_telemetry::TelemetryRegistry;
use gateway_worker::WorkerPool;

/// How long `/api/sms/inbound` waits for queue capacity before answering
/// 429. Matches the queue's own default block timeout on `enqueue`.
pub const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(10);

/// Every constructed component the ingress layer needs a handle to.
/// Built once at startup and shared behind `Arc` with every axum handler;
/// see `main.rs` for construction order.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<DeliveryQueue>,
    pub queue_max_size: usize,
    pub max_retry_attempts: u32,
    pub worker_pool: Arc<WorkerPool>,
    pub telegram: Arc<TelegramDispatcher>,
    pub email: Arc<EmailDispatcher>,
    pub dlo: Arc<DeadLetterStore>,
    pub telemetry: Arc<TelemetryRegistry>,
    pub health: Arc<HealthEvaluator>,
    pub incident: Arc<IncidentEngine>,
    pub metrics: Arc<MetricsAggregator>,
}
