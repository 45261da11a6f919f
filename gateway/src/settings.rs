//! Process-wide configuration, loaded case-insensitively from environment
//! variables via `envy`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default)]
    pub telegram_chat_id: String,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Inert: configures the external MQTT-HTTP bridge, never read by this
    /// binary. Parsed only so operators can share one `.env` between the
    /// bridge and the gateway.
    #[serde(default = "default_mqtt_broker_host")]
    pub mqtt_broker_host: String,
    #[serde(default = "default_mqtt_broker_port")]
    pub mqtt_broker_port: u16,
    #[serde(default = "default_mqtt_topic_sms")]
    pub mqtt_topic_sms: String,
    #[serde(default = "default_mqtt_topic_telemetry")]
    pub mqtt_topic_telemetry: String,

    #[serde(default)]
    pub n8n_webhook_url: String,
    #[serde(default)]
    pub n8n_webhook_secret: String,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default)]
    pub email_recipient: String,

    #[serde(default)]
    pub fernet_encryption_key: String,

    #[serde(default = "default_queue_max_size")]
    pub queue_max_size: usize,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_dlo_ttl_hours")]
    pub dlo_ttl_hours: u64,
    #[serde(default = "default_consumer_concurrency")]
    pub consumer_concurrency: usize,

    #[serde(default = "default_health_check_interval_seconds")]
    pub health_check_interval_seconds: u64,
    #[serde(default = "default_battery_low_threshold")]
    pub battery_low_threshold: i32,
    #[serde(default = "default_signal_low_threshold")]
    pub signal_low_threshold: i32,
    #[serde(default = "default_heartbeat_timeout_seconds")]
    pub heartbeat_timeout_seconds: u64,
    #[serde(default = "default_alert_cooldown_seconds")]
    pub alert_cooldown_seconds: u64,

    /// Not in the original's table (its server is launched by `uvicorn`
    /// with a separately configured bind address); an ambient surface
    /// needs one, so it is added here.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

impl Settings {
    /// Loads settings from the process environment, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if a present variable fails to parse into its
    /// declared type (e.g. a non-numeric `SMTP_PORT`).
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env::<Settings>()
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}
fn default_mqtt_broker_host() -> String {
    "localhost".to_string()
}
const fn default_mqtt_broker_port() -> u16 {
    1883
}
fn default_mqtt_topic_sms() -> String {
    "gateway/sms/inbound".to_string()
}
fn default_mqtt_topic_telemetry() -> String {
    "gateway/telemetry".to_string()
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
const fn default_smtp_port() -> u16 {
    587
}
const fn default_queue_max_size() -> usize {
    10000
}
const fn default_max_retry_attempts() -> u32 {
    5
}
const fn default_dlo_ttl_hours() -> u64 {
    72
}
const fn default_consumer_concurrency() -> usize {
    3
}
const fn default_health_check_interval_seconds() -> u64 {
    30
}
const fn default_battery_low_threshold() -> i32 {
    20
}
const fn default_signal_low_threshold() -> i32 {
    -100
}
const fn default_heartbeat_timeout_seconds() -> u64 {
    120
}
const fn default_alert_cooldown_seconds() -> u64 {
    300
}
fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}
