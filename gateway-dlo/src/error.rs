/// Errors surfaced by a single [`crate::DloBackend`]. Never crosses the
/// [`crate::DeadLetterStore`] boundary: `capture` absorbs a persistent
/// backend's error by falling back to the volatile store.
#[derive(Debug, thiserror::Error)]
pub enum DloError {
    #[error("persistent backend unavailable: {0}")]
    Backend(String),
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<redis::RedisError> for DloError {
    fn from(err: redis::RedisError) -> Self {
        DloError::Backend(err.to_string())
    }
}
