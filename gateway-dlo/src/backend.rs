use std::time::Duration;

use async_trait::async_trait;
use gateway_types::DeadLetter;

use crate::error::DloError;

/// Common contract both dead-letter backends implement: the persistent
/// (Redis-shaped) store and the in-process volatile fallback.
#[async_trait]
pub trait DloBackend: Send + Sync {
    /// Persists `letter`, refreshing the aggregate TTL to `ttl`.
    async fn put(&self, letter: &DeadLetter, ttl: Duration) -> Result<(), DloError>;

    async fn get(&self, sms_id: &str) -> Result<Option<DeadLetter>, DloError>;

    async fn list(&self) -> Result<Vec<DeadLetter>, DloError>;

    /// Returns whether an entry was present and removed.
    async fn remove(&self, sms_id: &str) -> Result<bool, DloError>;
}
