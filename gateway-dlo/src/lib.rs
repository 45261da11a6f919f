//! Dead-letter store: keyed retention for messages that exhausted their
//! retry budget, with TTL expiry, single-item retrieval, manual
//! re-injection, and purge. See [`DeadLetterStore`].

mod backend;
mod error;
mod memory;
mod metrics;
mod redis_backend;
mod store;

pub use backend::DloBackend;
pub use error::DloError;
pub use memory::MemoryBackend;
pub use metrics::{DloMetrics, DloMetricsSnapshot};
pub use redis_backend::RedisBackend;
pub use store::DeadLetterStore;
