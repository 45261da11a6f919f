//! OpenTelemetry observable instruments over the aggregated snapshot.
//!
//! A background task periodically refreshes a handful of atomics, and
//! observable instruments read those atomics from their callback rather
//! than doing any work themselves (the OTel SDK invokes callbacks
//! synchronously on its own collection cadence, so they can't await the
//! snapshot directly).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use opentelemetry::metrics::Meter;
use tokio::task::JoinHandle;

use crate::snapshot::MetricsAggregator;

pub struct GatewayInstruments {
    queue_depth: Arc<AtomicU64>,
    total_enqueued: Arc<AtomicU64>,
    total_delivered: Arc<AtomicU64>,
    total_failed: Arc<AtomicU64>,
    total_dead_lettered: Arc<AtomicU64>,
    dlo_current_count: Arc<AtomicU64>,
    incident_total_alerts: Arc<AtomicU64>,
}

impl GatewayInstruments {
    pub fn new() -> Self {
        let meter = meter();
        let queue_depth = Arc::new(AtomicU64::new(0));
        let total_enqueued = Arc::new(AtomicU64::new(0));
        let total_delivered = Arc::new(AtomicU64::new(0));
        let total_failed = Arc::new(AtomicU64::new(0));
        let total_dead_lettered = Arc::new(AtomicU64::new(0));
        let dlo_current_count = Arc::new(AtomicU64::new(0));
        let incident_total_alerts = Arc::new(AtomicU64::new(0));

        register_gauge(&meter, "gateway.queue.depth", "Current queue depth across all lanes", &queue_depth);
        register_counter(&meter, "gateway.queue.enqueued.total", "Total messages ever enqueued", &total_enqueued);
        register_counter(&meter, "gateway.delivery.delivered.total", "Total messages delivered", &total_delivered);
        register_counter(&meter, "gateway.delivery.failed.total", "Total delivery attempts exhausted", &total_failed);
        register_counter(&meter, "gateway.dlo.dead_lettered.total", "Total messages dead-lettered", &total_dead_lettered);
        register_gauge(&meter, "gateway.dlo.current_count", "Current dead-letter store size", &dlo_current_count);
        register_counter(&meter, "gateway.incident.alerts.total", "Total incidents triggered", &incident_total_alerts);

        GatewayInstruments {
            queue_depth,
            total_enqueued,
            total_delivered,
            total_failed,
            total_dead_lettered,
            dlo_current_count,
            incident_total_alerts,
        }
    }

    /// Spawns the periodic refresh task. The handle is owned by the
    /// caller, matching `WorkerPool::serve`'s convention of returning
    /// handles instead of detaching them.
    pub fn spawn_refresh(self: &Arc<Self>, aggregator: Arc<MetricsAggregator>, interval: Duration) -> JoinHandle<()> {
        let instruments = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let snapshot = aggregator.snapshot().await;
                instruments.queue_depth.store(snapshot.queue.queue_depth as u64, Ordering::Relaxed);
                instruments.total_enqueued.store(snapshot.queue.total_enqueued, Ordering::Relaxed);
                instruments.total_delivered.store(snapshot.queue.total_delivered, Ordering::Relaxed);
                instruments.total_failed.store(snapshot.queue.total_failed, Ordering::Relaxed);
                instruments
                    .total_dead_lettered
                    .store(snapshot.queue.total_dead_lettered, Ordering::Relaxed);
                instruments.dlo_current_count.store(snapshot.dlo.current_count, Ordering::Relaxed);
                instruments
                    .incident_total_alerts
                    .store(snapshot.cto_agent.total_alerts, Ordering::Relaxed);
            }
        })
    }
}

impl Default for GatewayInstruments {
    fn default() -> Self {
        GatewayInstruments::new()
    }
}

fn register_gauge(meter: &Meter, name: &'static str, description: &'static str, value: &Arc<AtomicU64>) {
    let value = Arc::clone(value);
    meter
        .u64_observable_gauge(name)
        .with_description(description)
        .with_callback(move |observer| {
            observer.observe(value.load(Ordering::Relaxed), &[]);
        })
        .build();
}

fn register_counter(meter: &Meter, name: &'static str, description: &'static str, value: &Arc<AtomicU64>) {
    let value = Arc::clone(value);
    meter
        .u64_observable_counter(name)
        .with_description(description)
        .with_callback(move |observer| {
            observer.observe(value.load(Ordering::Relaxed), &[]);
        })
        .build();
}

fn meter() -> Meter {
    opentelemetry::global::meter("gateway")
}
