use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gateway_types::Message;
use serde::Deserialize;
use tokio::time::Instant;

use crate::Dispatcher;

const API_BASE: &str = "https://api.telegram.org";
/// Telegram's documented cap of 30 messages/second to the same chat.
const MIN_SEND_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Overridable for tests; production always uses [`API_BASE`].
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        TelegramConfig {
            bot_token: String::new(),
            chat_id: String::new(),
            max_retries: 5,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            api_base: API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct TelegramMetrics {
    pub total_sent: u64,
    pub total_rate_limited: u64,
    pub total_errors: u64,
}

#[derive(Deserialize)]
struct TelegramErrorResponse {
    #[serde(default)]
    parameters: Option<TelegramErrorParameters>,
}

#[derive(Deserialize)]
struct TelegramErrorParameters {
    #[serde(default)]
    retry_after: u64,
}

/// Rate-limited primary dispatcher that sends to the chat-bot HTTP API.
pub struct TelegramDispatcher {
    config: TelegramConfig,
    client: reqwest::Client,
    last_send: Mutex<Instant>,
    total_sent: AtomicU64,
    total_rate_limited: AtomicU64,
    total_errors: AtomicU64,
}

impl TelegramDispatcher {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .build()
            .unwrap_or_default();

        TelegramDispatcher {
            config,
            client,
            last_send: Mutex::new(Instant::now() - MIN_SEND_INTERVAL),
            total_sent: AtomicU64::new(0),
            total_rate_limited: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    pub fn metrics(&self) -> TelegramMetrics {
        TelegramMetrics {
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_rate_limited: self.total_rate_limited.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
        }
    }

    /// Enforces the minimum interval between sends, sleeping the remainder
    /// when called too soon after the previous send.
    async fn throttle(&self) {
        let wait = {
            let mut last = self.last_send.lock().unwrap();
            let now = Instant::now();
            let elapsed = now.saturating_duration_since(*last);
            let wait = MIN_SEND_INTERVAL.saturating_sub(elapsed);
            *last = now + wait;
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    fn format_message(message: &Message) -> String {
        format!(
            "\u{1F4F1} <b>SMS Gateway Alert</b>\n\n\
             <b>From:</b> <code>{}</code>\n\
             <b>Time:</b> {}\n\
             <b>Node:</b> {}\n\n\
             <b>Message:</b>\n<code>{}</code>\n\n\
             <i>ID: {}</i>",
            message.sender, message.timestamp, message.node_id, message.body, message.sms_id
        )
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self
            .config
            .base_backoff
            .saturating_mul(1u32 << attempt.min(20));
        scaled.min(self.config.max_backoff)
    }
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    async fn send(&self, message: &Message) -> bool {
        if self.config.bot_token.is_empty() || self.config.chat_id.is_empty() {
            tracing::error!("telegram dispatcher not configured: missing bot_token or chat_id");
            return false;
        }

        let text = Self::format_message(message);
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        );

        for attempt in 0..self.config.max_retries {
            self.throttle().await;

            let response = self
                .client
                .post(&url)
                .json(&serde_json::json!({
                    "chat_id": self.config.chat_id,
                    "text": text,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    self.total_sent.fetch_add(1, Ordering::Relaxed);
                    gateway_common::outgoing!(
                        sms_id = %message.sms_id,
                        attempt = attempt + 1,
                        "telegram delivery succeeded"
                    );
                    return true;
                }
                Ok(resp) if resp.status().as_u16() == 429 => {
                    self.total_rate_limited.fetch_add(1, Ordering::Relaxed);
                    let retry_after = resp
                        .json::<TelegramErrorResponse>()
                        .await
                        .ok()
                        .and_then(|body| body.parameters)
                        .map(|p| p.retry_after)
                        .unwrap_or(0);
                    let backoff = Duration::from_secs(retry_after).max(self.backoff_for(attempt));
                    gateway_common::outgoing!(
                        sms_id = %message.sms_id,
                        attempt = attempt + 1,
                        backoff_secs = backoff.as_secs(),
                        "telegram rate limited"
                    );
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                Ok(resp) => {
                    self.total_errors.fetch_add(1, Ordering::Relaxed);
                    gateway_common::outgoing!(
                        sms_id = %message.sms_id,
                        status = resp.status().as_u16(),
                        attempt = attempt + 1,
                        "telegram request returned an error status"
                    );
                }
                Err(err) => {
                    self.total_errors.fetch_add(1, Ordering::Relaxed);
                    gateway_common::outgoing!(
                        sms_id = %message.sms_id,
                        error = %err,
                        attempt = attempt + 1,
                        "telegram request failed"
                    );
                }
            }

            if attempt + 1 < self.config.max_retries {
                tokio::time::sleep(self.backoff_for(attempt)).await;
            }
        }

        gateway_common::outgoing!(sms_id = %message.sms_id, "telegram retries exhausted");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::{MessageStatus, Priority};
    use serde_json::json;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_message() -> Message {
        Message {
            sms_id: "id-1".into(),
            sender: "+91".into(),
            body: "OTP is 123456".into(),
            timestamp: "2024-01-01 00:00:00".into(),
            node_id: "node-1".into(),
            status: MessageStatus::Queued,
            retry_count: 0,
            max_retries: 5,
            created_at: 0.0,
            last_error: String::new(),
            priority: Priority::High,
        }
    }

    #[tokio::test]
    async fn unconfigured_returns_false_without_network() {
        let dispatcher = TelegramDispatcher::new(TelegramConfig::default());
        let sent = dispatcher.send(&sample_message()).await;
        assert!(!sent);
        assert_eq!(dispatcher.metrics().total_sent, 0);
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/bot.*/sendMessage$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let dispatcher = TelegramDispatcher::new(test_config(&server));
        let sent = dispatcher.send(&sample_message()).await;
        assert!(sent);
        assert_eq!(dispatcher.metrics().total_sent, 1);
    }

    #[tokio::test]
    async fn rate_limit_then_success_counts_as_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/bot.*/sendMessage$"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"parameters": {"retry_after": 0}})),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/bot.*/sendMessage$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let dispatcher = TelegramDispatcher::new(test_config(&server));
        let sent = dispatcher.send(&sample_message()).await;
        assert!(sent);
        assert_eq!(dispatcher.metrics().total_rate_limited, 2);
    }

    fn test_config(server: &MockServer) -> TelegramConfig {
        TelegramConfig {
            bot_token: "TEST".into(),
            chat_id: "123".into(),
            max_retries: 5,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            api_base: server.uri(),
        }
    }
}
