//! Bounded, priority-aware delivery queue.
//!
//! A mapping from [`Priority`] to a FIFO lane, bounded in total across all
//! lanes. Producers block (rather than silently drop) when the queue is
//! full; consumers always see the highest-priority non-empty lane first,
//! FIFO within a lane.

mod encryption;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gateway_types::{Message, Priority};
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, timeout};

pub use encryption::{EncryptionKey, decrypt_body, encrypt_body};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue is full, backpressure active")]
    Full,
    #[error("queue is closed")]
    Closed,
}

struct Inner {
    lanes: [VecDeque<Message>; 3],
    closed: bool,
}

impl Inner {
    fn total(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    fn lane_index(priority: Priority) -> usize {
        match priority {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }

    fn pop_highest(&mut self) -> Option<Message> {
        self.lanes.iter_mut().find_map(VecDeque::pop_front)
    }
}

/// The bounded priority queue.
pub struct DeliveryQueue {
    inner: Mutex<Inner>,
    max_size: usize,
    not_full: Notify,
    not_empty: Notify,
    total_enqueued: AtomicU64,
}

impl DeliveryQueue {
    pub fn new(max_size: usize) -> Arc<Self> {
        Arc::new(DeliveryQueue {
            inner: Mutex::new(Inner {
                lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                closed: false,
            }),
            max_size,
            not_full: Notify::new(),
            not_empty: Notify::new(),
            total_enqueued: AtomicU64::new(0),
        })
    }

    /// Cumulative count of messages ever accepted by [`enqueue`](Self::enqueue),
    /// regardless of whether they were later delivered, dead-lettered, or
    /// are still in flight. Never decreases.
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(Ordering::Relaxed)
    }

    /// Enqueues a message, blocking up to `block_timeout` for a free slot.
    /// Never drops a message silently: returns [`QueueError::Full`] if no
    /// slot frees up in time.
    pub async fn enqueue(
        &self,
        message: Message,
        block_timeout: Duration,
    ) -> Result<usize, QueueError> {
        let deadline = Instant::now() + block_timeout;
        let priority = message.priority;
        let mut message = Some(message);

        loop {
            {
                let mut inner = self.inner.lock().await;
                if inner.closed {
                    return Err(QueueError::Closed);
                }
                if inner.total() < self.max_size {
                    inner.lanes[Inner::lane_index(priority)].push_back(message.take().unwrap());
                    let depth = inner.total();
                    drop(inner);
                    self.total_enqueued.fetch_add(1, Ordering::Relaxed);
                    self.not_empty.notify_waiters();
                    return Ok(depth);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(QueueError::Full);
            }
            if timeout(remaining, self.not_full.notified()).await.is_err() {
                return Err(QueueError::Full);
            }
        }
    }

    /// Dequeues the next message, highest-priority lane first, FIFO within
    /// a lane. Waits up to `wait` for something to arrive; returns `None`
    /// on timeout or once the queue is closed and drained.
    pub async fn dequeue(&self, wait: Duration) -> Option<Message> {
        let deadline = Instant::now() + wait;

        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(message) = inner.pop_highest() {
                    drop(inner);
                    self.not_full.notify_waiters();
                    return Some(message);
                }
                if inner.closed {
                    return None;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if timeout(remaining, self.not_empty.notified()).await.is_err() {
                return None;
            }
        }
    }

    /// Current total element count across all lanes.
    pub async fn depth(&self) -> usize {
        self.inner.lock().await.total()
    }

    /// The bound passed to [`DeliveryQueue::new`].
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Stops accepting new messages and wakes any blocked producers with
    /// [`QueueError::Closed`]. Waits up to `timeout` for workers to drain
    /// the remainder; returns the number of messages still queued when the
    /// wait ends (zero means a clean drain).
    pub async fn close_and_drain(&self, drain_timeout: Duration) -> usize {
        {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
        }
        self.not_full.notify_waiters();
        self.not_empty.notify_waiters();

        let deadline = Instant::now() + drain_timeout;
        loop {
            let depth = self.depth().await;
            if depth == 0 || Instant::now() >= deadline {
                return depth;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::MessageStatus;

    fn msg(id: &str, priority: Priority) -> Message {
        Message {
            sms_id: id.into(),
            sender: "+91".into(),
            body: "otp".into(),
            timestamp: "t".into(),
            node_id: "n".into(),
            status: MessageStatus::Queued,
            retry_count: 0,
            max_retries: 5,
            created_at: 0.0,
            last_error: String::new(),
            priority,
        }
    }

    #[tokio::test]
    async fn fifo_within_a_priority_lane() {
        let queue = DeliveryQueue::new(10);
        queue
            .enqueue(msg("a", Priority::Normal), Duration::from_secs(1))
            .await
            .unwrap();
        queue
            .enqueue(msg("b", Priority::Normal), Duration::from_secs(1))
            .await
            .unwrap();

        let first = queue.dequeue(Duration::from_secs(1)).await.unwrap();
        let second = queue.dequeue(Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.sms_id, "a");
        assert_eq!(second.sms_id, "b");
    }

    #[tokio::test]
    async fn high_priority_preempts_normal_for_next_dequeue() {
        let queue = DeliveryQueue::new(10);
        queue
            .enqueue(msg("low-first", Priority::Normal), Duration::from_secs(1))
            .await
            .unwrap();
        queue
            .enqueue(msg("high-second", Priority::High), Duration::from_secs(1))
            .await
            .unwrap();

        let first = queue.dequeue(Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.sms_id, "high-second");
    }

    #[tokio::test]
    async fn full_queue_rejects_after_block_timeout() {
        let queue = DeliveryQueue::new(1);
        queue
            .enqueue(msg("a", Priority::Normal), Duration::from_secs(1))
            .await
            .unwrap();

        let result = queue
            .enqueue(msg("b", Priority::Normal), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(QueueError::Full)));
    }

    #[tokio::test]
    async fn enqueue_unblocks_once_a_slot_frees() {
        let queue = DeliveryQueue::new(1);
        queue
            .enqueue(msg("a", Priority::Normal), Duration::from_secs(1))
            .await
            .unwrap();

        let queue2 = Arc::clone(&queue);
        let producer = tokio::spawn(async move {
            queue2
                .enqueue(msg("b", Priority::Normal), Duration::from_secs(2))
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let taken = queue.dequeue(Duration::from_secs(1)).await.unwrap();
        assert_eq!(taken.sms_id, "a");

        let result = producer.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn dequeue_times_out_on_empty_queue() {
        let queue = DeliveryQueue::new(10);
        let result = queue.dequeue(Duration::from_millis(50)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn close_and_drain_reports_zero_once_empty() {
        let queue = DeliveryQueue::new(10);
        let remaining = queue.close_and_drain(Duration::from_millis(200)).await;
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn total_enqueued_counts_every_accepted_message_and_never_decreases() {
        let queue = DeliveryQueue::new(10);
        assert_eq!(queue.total_enqueued(), 0);

        queue
            .enqueue(msg("a", Priority::Normal), Duration::from_secs(1))
            .await
            .unwrap();
        queue
            .enqueue(msg("b", Priority::High), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(queue.total_enqueued(), 2);

        queue.dequeue(Duration::from_secs(1)).await;
        assert_eq!(queue.total_enqueued(), 2);
    }

    #[tokio::test]
    async fn enqueue_after_close_is_rejected() {
        let queue = DeliveryQueue::new(10);
        queue.close_and_drain(Duration::from_millis(50)).await;
        let result = queue
            .enqueue(msg("a", Priority::Normal), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(QueueError::Closed)));
    }
}
