use serde::{Deserialize, Serialize};

/// Severity assigned to a detected issue, used to route the webhook in the
/// downstream automation system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Emergency,
}

/// Corrective action the incident engine recommends to the downstream
/// automation system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectiveAction {
    RestartNetworkSwitch,
    RestartGatewayNode,
    SendPushNotification,
    SendEscalationEmail,
    DrainMessageQueue,
    LogIncident,
    NoAction,
}

/// A recorded incident: one alert that survived cooldown, with the
/// severity/action the engine assigned and the outcome of the webhook
/// delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,
    pub alert_type: String,
    pub severity: Severity,
    pub issues: Vec<String>,
    pub action: CorrectiveAction,
    pub timestamp: f64,
    pub webhook_sent: bool,
    pub webhook_response_code: u16,
    /// Reserved but never set. There is no resolution path; this type does
    /// not invent one.
    pub resolved: bool,
}
