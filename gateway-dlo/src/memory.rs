use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use gateway_types::DeadLetter;
use tokio::sync::RwLock;

use crate::backend::DloBackend;
use crate::error::DloError;

/// Volatile in-process fallback, used when the persistent backend is
/// unconfigured or transparently substituted after a write failure.
#[derive(Default)]
pub struct MemoryBackend {
    letters: RwLock<HashMap<String, DeadLetter>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }
}

#[async_trait]
impl DloBackend for MemoryBackend {
    async fn put(&self, letter: &DeadLetter, _ttl: Duration) -> Result<(), DloError> {
        self.letters
            .write()
            .await
            .insert(letter.sms_id.clone(), letter.clone());
        Ok(())
    }

    async fn get(&self, sms_id: &str) -> Result<Option<DeadLetter>, DloError> {
        Ok(self.letters.read().await.get(sms_id).cloned())
    }

    async fn list(&self) -> Result<Vec<DeadLetter>, DloError> {
        Ok(self.letters.read().await.values().cloned().collect())
    }

    async fn remove(&self, sms_id: &str) -> Result<bool, DloError> {
        Ok(self.letters.write().await.remove(sms_id).is_some())
    }
}
