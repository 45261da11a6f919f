use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use gateway_health::{AlertListener, HealthReport};
use gateway_types::Incident;
use tokio::sync::Mutex;

use crate::classify::{classify_action, classify_severity};
use crate::webhook::WebhookClient;

/// Incidents kept in the circular buffer before the oldest is evicted.
const INCIDENT_BUFFER_CAP: usize = 100;

/// `gateway_version` stamped into every webhook payload's metadata block.
const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default)]
pub struct IncidentMetrics {
    total_alerts: AtomicU64,
    total_suppressed: AtomicU64,
    total_webhooks_sent: AtomicU64,
    total_webhook_errors: AtomicU64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct IncidentMetricsSnapshot {
    pub total_alerts: u64,
    pub total_suppressed: u64,
    pub total_webhooks_sent: u64,
    pub total_webhook_errors: u64,
    pub active_incidents: usize,
}

/// Incident engine: cooldown-gated alert intake, severity/action
/// classification, and signed webhook delivery to the downstream
/// automation endpoint.
pub struct IncidentEngine {
    webhook: WebhookClient,
    cooldown: Duration,
    last_alert_time: Mutex<HashMap<String, f64>>,
    incidents: Mutex<VecDeque<Incident>>,
    metrics: IncidentMetrics,
}

impl IncidentEngine {
    pub fn new(webhook_url: Option<String>, webhook_secret: Option<String>, cooldown: Duration) -> Self {
        IncidentEngine {
            webhook: WebhookClient::new(webhook_url, webhook_secret),
            cooldown,
            last_alert_time: Mutex::new(HashMap::new()),
            incidents: Mutex::new(VecDeque::new()),
            metrics: IncidentMetrics::default(),
        }
    }

    /// Evaluates `alert_type` against the per-category cooldown; if it
    /// passes, classifies severity/action, fires the webhook (if
    /// configured), records the incident, and returns it. Returns `None`
    /// when the cooldown suppresses the alert.
    pub async fn trigger_alert(
        &self,
        alert_type: &str,
        issues: Vec<String>,
        report: Option<&serde_json::Value>,
    ) -> Option<Incident> {
        let now = unix_seconds();
        {
            let mut last_alert_time = self.last_alert_time.lock().await;
            if let Some(&last) = last_alert_time.get(alert_type)
                && now - last < self.cooldown.as_secs_f64()
            {
                self.metrics.total_suppressed.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            last_alert_time.insert(alert_type.to_string(), now);
        }

        let issue_text = issues.join(" ");
        let severity = classify_severity(&issue_text, alert_type);
        let action = classify_action(&issue_text);
        let incident_id = incident_id(alert_type, now);

        let mut incident = Incident {
            incident_id: incident_id.clone(),
            alert_type: alert_type.to_string(),
            severity,
            issues,
            action,
            timestamp: now,
            webhook_sent: false,
            webhook_response_code: 0,
            resolved: false,
        };

        self.metrics.total_alerts.fetch_add(1, Ordering::Relaxed);

        if self.webhook.is_configured() {
            let payload = self.build_payload(&incident, report);
            let (sent, code) = self.webhook.send(&incident_id, &payload).await;
            incident.webhook_sent = sent;
            incident.webhook_response_code = code;
            if sent {
                self.metrics.total_webhooks_sent.fetch_add(1, Ordering::Relaxed);
            } else {
                self.metrics.total_webhook_errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut incidents = self.incidents.lock().await;
        if incidents.len() >= INCIDENT_BUFFER_CAP {
            incidents.pop_front();
        }
        incidents.push_back(incident.clone());

        Some(incident)
    }

    fn build_payload(&self, incident: &Incident, report: Option<&serde_json::Value>) -> serde_json::Value {
        serde_json::json!({
            "event": "gateway_alert",
            "incident": incident,
            "health_report": report.cloned().unwrap_or(serde_json::Value::Null),
            "metadata": {
                "gateway_version": GATEWAY_VERSION,
                "total_alerts": self.metrics.total_alerts.load(Ordering::Relaxed),
                "total_suppressed": self.metrics.total_suppressed.load(Ordering::Relaxed),
            }
        })
    }

    /// Most recent incidents, newest first, capped at `limit`.
    pub async fn recent(&self, limit: usize) -> Vec<Incident> {
        let incidents = self.incidents.lock().await;
        incidents.iter().rev().take(limit).cloned().collect()
    }

    pub async fn metrics(&self) -> IncidentMetricsSnapshot {
        IncidentMetricsSnapshot {
            total_alerts: self.metrics.total_alerts.load(Ordering::Relaxed),
            total_suppressed: self.metrics.total_suppressed.load(Ordering::Relaxed),
            total_webhooks_sent: self.metrics.total_webhooks_sent.load(Ordering::Relaxed),
            total_webhook_errors: self.metrics.total_webhook_errors.load(Ordering::Relaxed),
            active_incidents: self.incidents.lock().await.len(),
        }
    }
}

#[async_trait]
impl AlertListener for IncidentEngine {
    async fn on_alert(&self, alert_type: &str, issues: Vec<String>, report: HealthReport) {
        let report_json = serde_json::to_value(&report).ok();
        self.trigger_alert(alert_type, issues, report_json.as_ref()).await;
    }
}

/// `uppercase(first 12 hex chars of MD5("{alert_type}:{timestamp}"))`.
/// Collisions within the same second for the same `alert_type` are
/// acceptable: the cooldown already prevents two incidents of the same
/// category landing in the same window.
fn incident_id(alert_type: &str, timestamp: f64) -> String {
    let digest = md5::compute(format!("{alert_type}:{timestamp}"));
    format!("{digest:x}")[..12].to_uppercase()
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
