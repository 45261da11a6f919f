use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::message::{Message, MessageStatus, REDACTED_BODY};

/// A message that exhausted its retry budget and was moved to the
/// Dead-Letter Office. `body` is retained (still opaque ciphertext) so a
/// manual retry can reconstruct a full [`Message`].
#[derive(Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub sms_id: String,
    pub sender: String,
    pub body: String,
    pub timestamp: String,
    pub node_id: String,
    pub retry_count: u32,
    pub last_error: String,
    pub dead_lettered_at: f64,
    pub manual_retry_count: u32,
}

/// Redacted external view of a [`DeadLetter`], as returned by `/api/dlo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterView {
    pub sms_id: String,
    pub sender: String,
    pub body: String,
    pub timestamp: String,
    pub node_id: String,
    pub retry_count: u32,
    pub last_error: String,
    pub dead_lettered_at: f64,
    pub manual_retry_count: u32,
}

impl DeadLetter {
    /// Captures a message that has exhausted its retries.
    pub fn capture(message: &Message) -> Self {
        DeadLetter {
            sms_id: message.sms_id.clone(),
            sender: message.sender.clone(),
            body: message.body.clone(),
            timestamp: message.timestamp.clone(),
            node_id: message.node_id.clone(),
            retry_count: message.retry_count,
            last_error: message.last_error.clone(),
            dead_lettered_at: unix_seconds(),
            manual_retry_count: 0,
        }
    }

    /// Body-redacted view for external listing (`/api/dlo`).
    pub fn to_view(&self) -> DeadLetterView {
        DeadLetterView {
            sms_id: self.sms_id.clone(),
            sender: self.sender.clone(),
            body: REDACTED_BODY.to_string(),
            timestamp: self.timestamp.clone(),
            node_id: self.node_id.clone(),
            retry_count: self.retry_count,
            last_error: self.last_error.clone(),
            dead_lettered_at: self.dead_lettered_at,
            manual_retry_count: self.manual_retry_count,
        }
    }

    /// Serializes for persistent-store storage. Keeps the real (still
    /// encrypted) body, since the persistent backend must support retry.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Builds a fresh, retry-reset [`Message`] for manual re-injection.
    pub fn into_retry_message(mut self) -> Message {
        self.manual_retry_count += 1;
        Message {
            sms_id: self.sms_id,
            sender: self.sender,
            body: self.body,
            timestamp: self.timestamp,
            node_id: self.node_id,
            status: MessageStatus::Queued,
            retry_count: 0,
            max_retries: 5,
            created_at: unix_seconds(),
            last_error: String::new(),
            priority: crate::priority::Priority::Normal,
        }
    }
}

impl fmt::Debug for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadLetter")
            .field("sms_id", &self.sms_id)
            .field("sender", &self.sender)
            .field("body", &REDACTED_BODY)
            .field("timestamp", &self.timestamp)
            .field("node_id", &self.node_id)
            .field("retry_count", &self.retry_count)
            .field("last_error", &self.last_error)
            .field("dead_lettered_at", &self.dead_lettered_at)
            .field("manual_retry_count", &self.manual_retry_count)
            .finish()
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
