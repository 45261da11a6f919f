//! Worker pool: drains the delivery queue, tries each registered primary
//! dispatcher in order, falls back to the fallback dispatcher, and either
//! re-enqueues with backoff or hands a message to the dead-letter sink
//! once retries are exhausted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gateway_dispatch::Dispatcher;
use gateway_queue::DeliveryQueue;
use gateway_types::{Message, MessageStatus};
use tokio::task::JoinHandle;

/// How long a retried message may block waiting for queue capacity before
/// the worker gives up and dead-letters it instead.
const REQUEUE_TIMEOUT: Duration = Duration::from_secs(10);

/// Ceiling on the exponential retry backoff, in seconds.
const MAX_BACKOFF_SECS: u32 = 60;

/// Capability interface for handing an exhausted message off to the
/// dead-letter store. Kept as a trait so the worker pool never depends on
/// `gateway-dlo` concretely.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn capture(&self, message: Message);
}

#[derive(Debug, Default)]
pub struct WorkerMetrics {
    total_delivered: AtomicU64,
    total_failed: AtomicU64,
    total_dead_lettered: AtomicU64,
    active_workers: AtomicUsize,
    running: AtomicBool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkerMetricsSnapshot {
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_dead_lettered: u64,
    pub active_workers: usize,
    pub running: bool,
}

impl WorkerMetrics {
    pub fn snapshot(&self) -> WorkerMetricsSnapshot {
        WorkerMetricsSnapshot {
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_dead_lettered: self.total_dead_lettered.load(Ordering::Relaxed),
            active_workers: self.active_workers.load(Ordering::Relaxed),
            running: self.running.load(Ordering::Relaxed),
        }
    }
}

/// A cooperative pool of workers draining a shared [`DeliveryQueue`].
pub struct WorkerPool {
    queue: Arc<DeliveryQueue>,
    primaries: Vec<Arc<dyn Dispatcher>>,
    fallback: Option<Arc<dyn Dispatcher>>,
    dlo: Arc<dyn DeadLetterSink>,
    concurrency: usize,
    stop: Arc<AtomicBool>,
    metrics: Arc<WorkerMetrics>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<DeliveryQueue>,
        primaries: Vec<Arc<dyn Dispatcher>>,
        fallback: Option<Arc<dyn Dispatcher>>,
        dlo: Arc<dyn DeadLetterSink>,
        concurrency: usize,
    ) -> Arc<Self> {
        Arc::new(WorkerPool {
            queue,
            primaries,
            fallback,
            dlo,
            concurrency,
            stop: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(WorkerMetrics::default()),
        })
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Spawns `concurrency` workers. Returns their join handles so the
    /// caller can await a clean exit or abort a straggler after
    /// [`WorkerPool::stop`] times out.
    pub fn serve(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        self.metrics.running.store(true, Ordering::Relaxed);
        (0..self.concurrency)
            .map(|id| {
                let pool = Arc::clone(self);
                tokio::spawn(async move { pool.run_worker(id).await })
            })
            .collect()
    }

    async fn run_worker(self: Arc<Self>, id: usize) {
        self.metrics.active_workers.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(worker_id = id, "worker started");

        loop {
            match self.queue.dequeue(Duration::from_secs(1)).await {
                Some(message) => self.process(message).await,
                None if self.stop.load(Ordering::Relaxed) => break,
                None => continue,
            }
        }

        self.metrics.active_workers.fetch_sub(1, Ordering::Relaxed);
        tracing::debug!(worker_id = id, "worker stopped");
    }

    /// Stops accepting new work, waits up to `drain_timeout` for in-flight
    /// and queued messages to finish, then aborts any worker still running.
    /// Returns the number of messages left unprocessed.
    pub async fn stop(self: &Arc<Self>, handles: Vec<JoinHandle<()>>, drain_timeout: Duration) -> usize {
        self.stop.store(true, Ordering::Relaxed);
        let remaining = self.queue.close_and_drain(drain_timeout).await;

        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
            }
        }

        self.metrics.running.store(false, Ordering::Relaxed);
        self.metrics.active_workers.store(0, Ordering::Relaxed);
        remaining
    }

    async fn process(&self, mut message: Message) {
        message.status = MessageStatus::Processing;

        if self.try_channels(&mut message).await {
            message.status = MessageStatus::Delivered;
            self.metrics.total_delivered.fetch_add(1, Ordering::Relaxed);
            gateway_common::internal!(sms_id = %message.sms_id, "message delivered");
            return;
        }

        message.retry_count += 1;
        if message.retry_count < message.max_retries {
            let backoff =
                Duration::from_secs(2u64.saturating_pow(message.retry_count).min(u64::from(MAX_BACKOFF_SECS)));
            gateway_common::internal!(
                sms_id = %message.sms_id,
                retry_count = message.retry_count,
                backoff_secs = backoff.as_secs(),
                "delivery failed, scheduling retry"
            );
            tokio::time::sleep(backoff).await;
            message.status = MessageStatus::Queued;
            if self.queue.enqueue(message.clone(), REQUEUE_TIMEOUT).await.is_err() {
                message.last_error = "requeue failed: queue full or closed".into();
                self.dead_letter(message).await;
            }
        } else {
            self.metrics.total_failed.fetch_add(1, Ordering::Relaxed);
            self.dead_letter(message).await;
        }
    }

    /// Tries every primary in registration order, then the fallback if
    /// configured. Returns whether the message was delivered.
    async fn try_channels(&self, message: &mut Message) -> bool {
        for primary in &self.primaries {
            if primary.send(message).await {
                return true;
            }
            message.last_error = "primary dispatch channel failed".into();
        }

        if let Some(fallback) = &self.fallback
            && fallback.send(message).await
        {
            return true;
        }
        if self.fallback.is_some() {
            message.last_error = "fallback dispatch channel failed".into();
        }

        false
    }

    async fn dead_letter(&self, message: Message) {
        self.metrics.total_dead_lettered.fetch_add(1, Ordering::Relaxed);
        gateway_common::internal!(
            sms_id = %message.sms_id,
            retry_count = message.retry_count,
            "message exhausted retries, dead-lettering"
        );
        self.dlo.capture(message).await;
    }
}
