use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use gateway_types::{DeadLetter, DeadLetterView, Message};
use gateway_worker::DeadLetterSink;

use crate::backend::DloBackend;
use crate::memory::MemoryBackend;
use crate::metrics::{DloMetrics, DloMetricsSnapshot};

/// Dead-letter store: a persistent backend, with a volatile in-process
/// fallback that absorbs writes whenever the persistent side is
/// unconfigured or fails. Operations merge across both: a message
/// captured during an outage and one captured afterward both remain
/// retrievable.
pub struct DeadLetterStore {
    persistent: Option<Arc<dyn DloBackend>>,
    volatile: MemoryBackend,
    ttl: Duration,
    metrics: DloMetrics,
}

impl DeadLetterStore {
    pub fn new(persistent: Option<Arc<dyn DloBackend>>, ttl: Duration) -> Self {
        DeadLetterStore {
            persistent,
            volatile: MemoryBackend::new(),
            ttl,
            metrics: DloMetrics::default(),
        }
    }

    pub fn without_persistence(ttl: Duration) -> Self {
        DeadLetterStore::new(None, ttl)
    }

    /// Persists a dead-lettered message, keyed by `sms_id`. Falls back to
    /// the volatile store transparently on a persistent-backend failure.
    /// The caller always observes success; only the metric and a
    /// body-free log line record the degradation.
    pub async fn capture(&self, letter: DeadLetter) {
        if let Some(backend) = &self.persistent {
            match backend.put(&letter, self.ttl).await {
                Ok(()) => {
                    self.metrics.record_capture(false);
                    return;
                }
                Err(err) => {
                    gateway_common::internal!(
                        sms_id = %letter.sms_id,
                        error = %err,
                        "dlo persistent backend failed, falling back to volatile store"
                    );
                }
            }
        }
        // `put` on the in-process map cannot fail.
        let _ = self.volatile.put(&letter, self.ttl).await;
        self.metrics.record_capture(true);
    }

    pub async fn list_all(&self) -> Vec<DeadLetterView> {
        self.merged_list()
            .await
            .into_iter()
            .map(|letter| letter.to_view())
            .collect()
    }

    /// Internal-use lookup (body retained) backing manual retry.
    pub async fn get(&self, sms_id: &str) -> Option<DeadLetter> {
        if let Some(backend) = &self.persistent
            && let Ok(Some(letter)) = backend.get(sms_id).await
        {
            return Some(letter);
        }
        self.volatile.get(sms_id).await.ok().flatten()
    }

    pub async fn remove(&self, sms_id: &str) -> bool {
        let mut removed = false;
        if let Some(backend) = &self.persistent
            && backend.remove(sms_id).await.unwrap_or(false)
        {
            removed = true;
        }
        if self.volatile.remove(sms_id).await.unwrap_or(false) {
            removed = true;
        }
        removed
    }

    /// Fetches the dead letter, increments `manual_retry_count`, rebuilds a
    /// fresh `Queued` [`Message`], and hands it to `reinject`. Removes the
    /// entry only once `reinject` reports success.
    pub async fn retry<F, Fut>(&self, sms_id: &str, reinject: F) -> bool
    where
        F: FnOnce(Message) -> Fut,
        Fut: Future<Output = bool>,
    {
        let Some(letter) = self.get(sms_id).await else {
            return false;
        };
        let message = letter.into_retry_message();
        if reinject(message).await {
            self.remove(sms_id).await;
            self.metrics.record_retry();
            true
        } else {
            false
        }
    }

    /// Removes every entry whose `dead_lettered_at` is older than `ttl`.
    /// Returns the number purged.
    pub async fn purge_expired(&self) -> usize {
        let cutoff = unix_seconds() - self.ttl.as_secs_f64();
        let expired: Vec<String> = self
            .merged_list()
            .await
            .into_iter()
            .filter(|letter| letter.dead_lettered_at < cutoff)
            .map(|letter| letter.sms_id)
            .collect();

        let mut purged = 0usize;
        for sms_id in &expired {
            if self.remove(sms_id).await {
                purged += 1;
            }
        }
        self.metrics.record_purge(purged as u64);
        purged
    }

    /// Clears every entry from both backends. Returns the number purged.
    pub async fn purge_all(&self) -> usize {
        let ids: Vec<String> = self
            .merged_list()
            .await
            .into_iter()
            .map(|letter| letter.sms_id)
            .collect();
        let mut purged = 0usize;
        for sms_id in &ids {
            if self.remove(sms_id).await {
                purged += 1;
            }
        }
        self.metrics.record_purge(purged as u64);
        purged
    }

    pub async fn metrics(&self) -> DloMetricsSnapshot {
        let count = self.merged_list().await.len() as u64;
        self.metrics.snapshot(count)
    }

    async fn merged_list(&self) -> Vec<DeadLetter> {
        let mut seen = std::collections::HashSet::new();
        let mut all = Vec::new();

        if let Some(backend) = &self.persistent
            && let Ok(entries) = backend.list().await
        {
            for letter in entries {
                seen.insert(letter.sms_id.clone());
                all.push(letter);
            }
        }
        if let Ok(entries) = self.volatile.list().await {
            for letter in entries {
                if seen.insert(letter.sms_id.clone()) {
                    all.push(letter);
                }
            }
        }
        all
    }
}

#[async_trait]
impl DeadLetterSink for DeadLetterStore {
    async fn capture(&self, message: Message) {
        let letter = DeadLetter::capture(&message);
        DeadLetterStore::capture(self, letter).await;
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
    use gateway_types::{MessageStatus, Priority};

    fn exhausted_message(id: &str) -> Message {
        Message {
            sms_id: id.into(),
            sender: "+91".into(),
            body: "otp".into(),
            timestamp: "t".into(),
            node_id: "n".into(),
            status: MessageStatus::Failed,
            retry_count: 2,
            max_retries: 2,
            created_at: 0.0,
            last_error: "Timeout".into(),
            priority: Priority::High,
        }
    }

    #[tokio::test]
    async fn capture_without_persistent_backend_lands_in_volatile() {
        let store = DeadLetterStore::without_persistence(Duration::from_secs(3600));
        DeadLetterSink::capture(&store, exhausted_message("a")).await;

        let views = store.list_all().await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].body, gateway_types::REDACTED_BODY);
    }

    #[tokio::test]
    async fn get_retains_body_for_retry() {
        let store = DeadLetterStore::without_persistence(Duration::from_secs(3600));
        DeadLetterSink::capture(&store, exhausted_message("a")).await;

        let letter = store.get("a").await.unwrap();
        assert_eq!(letter.body, "otp");
    }

    #[tokio::test]
    async fn retry_removes_entry_only_on_reinject_success() {
        let store = DeadLetterStore::without_persistence(Duration::from_secs(3600));
        DeadLetterSink::capture(&store, exhausted_message("a")).await;

        let failed = store.retry("a", |_msg| async { false }).await;
        assert!(!failed);
        assert!(store.get("a").await.is_some());

        let succeeded = store.retry("a", |msg| async move {
            assert_eq!(msg.retry_count, 0);
            assert_eq!(msg.status, MessageStatus::Queued);
            true
        }).await;
        assert!(succeeded);
        assert!(store.get("a").await.is_none());
    }

    #[tokio::test]
    async fn retry_on_missing_id_returns_false() {
        let store = DeadLetterStore::without_persistence(Duration::from_secs(3600));
        assert!(!store.retry("missing", |_| async { true }).await);
    }

    #[tokio::test]
    async fn purge_expired_removes_only_old_entries() {
        let store = DeadLetterStore::without_persistence(Duration::from_millis(50));
        DeadLetterSink::capture(&store, exhausted_message("a")).await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        let purged = store.purge_expired().await;
        assert_eq!(purged, 1);
        assert!(store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn purge_all_clears_everything() {
        let store = DeadLetterStore::without_persistence(Duration::from_secs(3600));
        DeadLetterSink::capture(&store, exhausted_message("a")).await;
        DeadLetterSink::capture(&store, exhausted_message("b")).await;

        let purged = store.purge_all().await;
        assert_eq!(purged, 2);
        assert!(store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn remove_reports_whether_entry_existed() {
        let store = DeadLetterStore::without_persistence(Duration::from_secs(3600));
        DeadLetterSink::capture(&store, exhausted_message("a")).await;

        assert!(store.remove("a").await);
        assert!(!store.remove("a").await);
    }
}
