use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::priority::Priority;

/// Sentinel substituted for `body` in every externally observable view of a
/// [`Message`] or [`DeadLetter`]. The body never crosses into logs or
/// metrics.
pub const REDACTED_BODY: &str = "[ENCRYPTED]";

/// Lifecycle status of a message moving through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Processing,
    Delivered,
    Failed,
    DeadLettered,
}

/// An SMS in flight through the delivery pipeline.
///
/// `body` is treated as opaque ciphertext: it is read only by the
/// dispatchers and the dead-letter store. Everything else (logging,
/// metrics, the queue itself) only ever touches `sms_id`, `sender`,
/// `status`, and `last_error`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Message {
    pub sms_id: String,
    pub sender: String,
    pub body: String,
    pub timestamp: String,
    pub node_id: String,
    pub status: MessageStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: f64,
    pub last_error: String,
    pub priority: Priority,
}

impl Message {
    /// Builds a message for ingress. An empty `sms_id` defaults to
    /// `api-{unix_millis}`, and an empty `timestamp` defaults to the
    /// current wall-clock time formatted `%Y-%m-%d %H:%M:%S`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_ingress(
        sms_id: String,
        sender: String,
        body: String,
        timestamp: String,
        node_id: String,
        priority: Priority,
        max_retries: u32,
    ) -> Self {
        let sms_id = if sms_id.is_empty() {
            default_sms_id()
        } else {
            sms_id
        };
        let timestamp = if timestamp.is_empty() {
            default_timestamp()
        } else {
            timestamp
        };

        Message {
            sms_id,
            sender,
            body,
            timestamp,
            node_id,
            status: MessageStatus::Queued,
            retry_count: 0,
            max_retries,
            created_at: unix_seconds(),
            last_error: String::new(),
            priority,
        }
    }

    /// True while `retry_count < max_retries`: the message may still be
    /// retried rather than dead-lettered.
    pub fn is_retriable(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("sms_id", &self.sms_id)
            .field("sender", &self.sender)
            .field("body", &REDACTED_BODY)
            .field("timestamp", &self.timestamp)
            .field("node_id", &self.node_id)
            .field("status", &self.status)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .field("last_error", &self.last_error)
            .field("priority", &self.priority)
            .finish()
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn default_sms_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("api-{millis}")
}

fn default_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sms_id_when_empty() {
        let msg = Message::from_ingress(
            String::new(),
            "+91".into(),
            "otp".into(),
            String::new(),
            "node-1".into(),
            Priority::High,
            5,
        );
        assert!(msg.sms_id.starts_with("api-"));
        assert!(!msg.timestamp.is_empty());
    }

    #[test]
    fn preserves_caller_supplied_id() {
        let msg = Message::from_ingress(
            "custom-1".into(),
            "+91".into(),
            "otp".into(),
            "2024-01-01 00:00:00".into(),
            "node-1".into(),
            Priority::Normal,
            5,
        );
        assert_eq!(msg.sms_id, "custom-1");
        assert_eq!(msg.timestamp, "2024-01-01 00:00:00");
    }

    #[test]
    fn debug_redacts_body() {
        let msg = Message::from_ingress(
            "id".into(),
            "s".into(),
            "super secret otp".into(),
            "t".into(),
            "n".into(),
            Priority::Normal,
            5,
        );
        let rendered = format!("{msg:?}");
        assert!(!rendered.contains("super secret otp"));
        assert!(rendered.contains(REDACTED_BODY));
    }

    #[test]
    fn retriable_below_max() {
        let mut msg = Message::from_ingress(
            "id".into(),
            "s".into(),
            "b".into(),
            "t".into(),
            "n".into(),
            Priority::Normal,
            2,
        );
        assert!(msg.is_retriable());
        msg.retry_count = 2;
        assert!(!msg.is_retriable());
    }
}
